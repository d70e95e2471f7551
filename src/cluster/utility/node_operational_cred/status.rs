//! Mapping of internal failures onto the two error channels of the cluster:
//! Interaction Model status codes and `NOCResponse` status codes.

use tracing::debug;

use crate::{
    acl::AclError,
    constants::MAX_DEBUG_TEXT_LEN,
    fabric::{FabricError, FabricIndex},
    group_keys::GroupKeyError,
    interaction_model::ImStatus,
    tlv::{Encoder, TagControl, TagLengthValue},
};

/// NodeOperationalCertStatusEnum (11.18.4.2)
#[repr(u8)]
#[derive(FromPrimitive, ToPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NocStatus {
    Ok = 0,
    InvalidPublicKey = 1,
    InvalidNodeOpId = 2,
    InvalidNoc = 3,
    MissingCsr = 4,
    TableFull = 5,
    InvalidAdminSubject = 6,
    // 7 and 8 are reserved
    FabricConflict = 9,
    LabelConflict = 10,
    InvalidFabricIndex = 11,
}

/// NOCResponse command (11.18.6.10)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NocResponse {
    pub status: NocStatus,
    pub fabric_index: Option<FabricIndex>,
    pub debug_text: Option<heapless::String<MAX_DEBUG_TEXT_LEN>>,
}

impl NocResponse {
    pub fn ok(fabric_index: FabricIndex) -> Self {
        Self {
            status: NocStatus::Ok,
            fabric_index: Some(fabric_index),
            debug_text: None,
        }
    }

    pub fn error(status: NocStatus) -> Self {
        Self {
            status,
            fabric_index: None,
            debug_text: None,
        }
    }

    /// Attach `text`, truncated to the longest prefix within
    /// [`MAX_DEBUG_TEXT_LEN`] bytes that ends on a character boundary.
    pub fn with_debug_text(mut self, text: &str) -> Self {
        let mut end = text.len().min(MAX_DEBUG_TEXT_LEN);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let mut debug_text = heapless::String::new();
        // Fits after truncation
        let _ = debug_text.push_str(&text[..end]);
        self.debug_text = Some(debug_text);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == NocStatus::Ok
    }

    pub fn to_tlv(&self, encoder: &mut Encoder, tag: TagControl) {
        encoder.start_struct(tag);
        encoder.write(
            TagControl::ContextSpecific(0),
            TagLengthValue::Unsigned8(self.status as u8),
        );
        if let Some(fabric_index) = self.fabric_index {
            encoder.write(
                TagControl::ContextSpecific(1),
                TagLengthValue::Unsigned8(fabric_index.get()),
            );
        }
        if let Some(debug_text) = &self.debug_text {
            encoder.write(
                TagControl::ContextSpecific(2),
                TagLengthValue::String(debug_text.as_str()),
            );
        }
        encoder.end_container();
    }
}

/// Failure of a NOC command, on one of the two channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NocError {
    #[error("NOC status {0:?}")]
    Status(NocStatus),
    #[error(transparent)]
    Im(#[from] ImStatus),
}

impl From<NocStatus> for NocError {
    fn from(status: NocStatus) -> Self {
        Self::Status(status)
    }
}

/// The `NOCResponse` status for a credential store failure, `None` when the
/// failure has no semantic meaning and must be reported as a plain failure.
pub fn noc_status_for(err: &FabricError) -> Option<NocStatus> {
    match err {
        FabricError::TableFull | FabricError::NoMemory => Some(NocStatus::TableFull),
        FabricError::InvalidPublicKey => Some(NocStatus::InvalidPublicKey),
        FabricError::WrongNodeId => Some(NocStatus::InvalidNodeOpId),
        FabricError::FabricExists => Some(NocStatus::FabricConflict),
        FabricError::Cert(_) => Some(NocStatus::InvalidNoc),
        FabricError::IncorrectState => Some(NocStatus::MissingCsr),
        FabricError::NotFound | FabricError::InvalidFabricIndex => {
            Some(NocStatus::InvalidFabricIndex)
        }
        FabricError::InvalidArgument | FabricError::Crypto(_) => None,
    }
}

/// The Interaction Model status for a credential store failure in a command
/// without a `NOCResponse` (AddTrustedRootCertificate, CSRRequest).
pub fn im_status_for(err: &FabricError) -> ImStatus {
    match err {
        FabricError::NoMemory | FabricError::TableFull => ImStatus::ResourceExhausted,
        FabricError::IncorrectState => ImStatus::ConstraintError,
        FabricError::Cert(_) | FabricError::InvalidArgument => ImStatus::InvalidCommand,
        FabricError::NotFound | FabricError::InvalidFabricIndex => ImStatus::NotFound,
        _ => ImStatus::Failure,
    }
}

impl From<FabricError> for NocError {
    fn from(err: FabricError) -> Self {
        debug!(%err, "Credential store failure");
        match noc_status_for(&err) {
            Some(status) => Self::Status(status),
            None => Self::Im(ImStatus::Failure),
        }
    }
}

impl From<GroupKeyError> for NocError {
    fn from(err: GroupKeyError) -> Self {
        match err {
            GroupKeyError::TableFull => Self::Status(NocStatus::TableFull),
            _ => Self::Im(ImStatus::Failure),
        }
    }
}

impl From<AclError> for NocError {
    fn from(err: AclError) -> Self {
        match err {
            AclError::TableFull => Self::Status(NocStatus::TableFull),
            AclError::TooManySubjects => Self::Im(ImStatus::Failure),
        }
    }
}
