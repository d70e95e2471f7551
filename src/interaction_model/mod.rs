pub mod events;
pub mod reporting;

/// Interaction Model status codes (8.10)
///
/// These form the constraint-level error channel: a command that fails with
/// one of these produces a status response and no command payload.
#[repr(u8)]
#[derive(FromPrimitive, ToPrimitive, Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ImStatus {
    #[error("success")]
    Success = 0x00,
    #[error("failure")]
    Failure = 0x01,
    #[error("unsupported access")]
    UnsupportedAccess = 0x7E,
    #[error("unsupported command")]
    UnsupportedCommand = 0x81,
    #[error("invalid command")]
    InvalidCommand = 0x85,
    #[error("unsupported attribute")]
    UnsupportedAttribute = 0x86,
    #[error("constraint error")]
    ConstraintError = 0x87,
    #[error("resource exhausted")]
    ResourceExhausted = 0x89,
    #[error("not found")]
    NotFound = 0x8B,
    #[error("fail-safe required")]
    FailsafeRequired = 0xCA,
}

/// A concrete attribute path, used to flag attributes whose value changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributePath {
    pub endpoint: u16,
    pub cluster: u32,
    pub attribute: u32,
}

impl AttributePath {
    pub const fn new(endpoint: u16, cluster: u32, attribute: u32) -> Self {
        Self {
            endpoint,
            cluster,
            attribute,
        }
    }
}

/// Read context of an attribute read (8.4.3.2)
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadContext {
    /// Fabric of the reading session, `None` over PASE before AddNOC.
    pub accessing_fabric: Option<crate::fabric::FabricIndex>,
    pub fabric_filtered: bool,
}
