//! Defines core types in the data model

use bitflags::bitflags;

use crate::acl::Privilege;

pub mod device;
pub mod device_type;
pub mod endpoint;

bitflags! {
    /// Attribute qualities (7.7)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AttributeQuality: u8 {
        const FIXED = 0x01;
        const NULLABLE = 0x02;
        const LIST = 0x04;
        const FABRIC_SCOPED = 0x08;
        const FABRIC_SENSITIVE = 0x10;
    }
}

/// Attribute (7.13)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute {
    pub id: u16,
    pub quality: AttributeQuality,
    /// Privilege needed to read the attribute.
    pub access: Privilege,
}

impl Attribute {
    pub const fn new(id: u16, quality: AttributeQuality, access: Privilege) -> Self {
        Self {
            id,
            quality,
            access,
        }
    }
}
