//! Fabrics the node belongs to, and the staging of credentials for new or
//! updated fabrics during a fail-safe.

use core::{fmt, num::NonZeroU8};

use crate::{constants::*, crypto::KeyPair};

pub mod events;
pub mod table;

pub use events::{FabricEvent, FabricListener};
pub use table::{FabricError, FabricTable, PendingKey};

/// Index of a fabric in the fabric table (7.5.2)
///
/// Valid indices are `1..=254`; the undefined index 0 is represented by
/// `Option::<FabricIndex>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FabricIndex(NonZeroU8);

impl FabricIndex {
    pub const MIN: FabricIndex = FabricIndex(NonZeroU8::MIN);
    pub const MAX: u8 = 254;

    pub const fn new(index: u8) -> Option<Self> {
        if index > Self::MAX {
            return None;
        }
        match NonZeroU8::new(index) {
            Some(index) => Some(Self(index)),
            None => None,
        }
    }

    pub const fn get(self) -> u8 {
        self.0.get()
    }

    /// The next index, wrapping from 254 back to 1.
    pub fn next_wrapping(self) -> Self {
        Self::new(self.get() + 1).unwrap_or(Self::MIN)
    }
}

impl fmt::Display for FabricIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

pub const fn is_operational_node_id(node_id: u64) -> bool {
    node_id >= MIN_OPERATIONAL_NODE_ID && node_id <= MAX_OPERATIONAL_NODE_ID
}

/// Subjects in the CAT range carry a 32-bit CASE Authenticated Tag.
pub const fn is_cat_node_id(node_id: u64) -> bool {
    node_id >= MIN_CASE_AUTH_TAG_NODE_ID && node_id <= MAX_CASE_AUTH_TAG_NODE_ID
}

/// A CAT is its identifier in the upper 16 bits and a version in the lower,
/// version 0 is reserved.
pub const fn is_valid_cat(cat: u32) -> bool {
    cat & 0xFFFF != 0
}

/// Whether `subject` can be the CaseAdminSubject of AddNOC.
pub const fn is_valid_case_admin_subject(subject: u64) -> bool {
    is_operational_node_id(subject) || (is_cat_node_id(subject) && is_valid_cat(subject as u32))
}

pub const fn is_vendor_id_valid_operationally(vendor_id: u16) -> bool {
    vendor_id != VENDOR_ID_COMMON && vendor_id <= VENDOR_ID_MAX_OPERATIONAL
}

/// A fabric the node is a member of, committed or pending.
#[derive(Debug, Clone)]
pub struct FabricInfo {
    pub(crate) index: FabricIndex,
    pub(crate) root_cert: Vec<u8>,
    pub(crate) icac: Option<Vec<u8>>,
    pub(crate) noc: Vec<u8>,
    pub(crate) node_id: u64,
    pub(crate) fabric_id: u64,
    pub(crate) compressed_fabric_id: u64,
    pub(crate) root_public_key: [u8; EC_POINT_LEN_BYTES],
    pub(crate) vendor_id: u16,
    pub(crate) label: heapless::String<MAX_FABRIC_LABEL_LEN>,
    pub(crate) operational_key: KeyPair,
}

impl FabricInfo {
    pub fn index(&self) -> FabricIndex {
        self.index
    }

    pub fn root_cert(&self) -> &[u8] {
        &self.root_cert
    }

    pub fn icac(&self) -> Option<&[u8]> {
        self.icac.as_deref()
    }

    pub fn noc(&self) -> &[u8] {
        &self.noc
    }

    pub fn node_id(&self) -> u64 {
        self.node_id
    }

    pub fn fabric_id(&self) -> u64 {
        self.fabric_id
    }

    pub fn compressed_fabric_id(&self) -> u64 {
        self.compressed_fabric_id
    }

    pub fn root_public_key(&self) -> &[u8; EC_POINT_LEN_BYTES] {
        &self.root_public_key
    }

    pub fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn operational_key(&self) -> &KeyPair {
        &self.operational_key
    }

    /// The FabricDescriptorStruct exposed through the Fabrics attribute.
    pub fn descriptor(&self) -> FabricDescriptor {
        FabricDescriptor {
            root_public_key: self.root_public_key,
            vendor_id: self.vendor_id,
            fabric_id: self.fabric_id,
            node_id: self.node_id,
            label: self.label.clone(),
            fabric_index: self.index,
        }
    }
}

/// FabricDescriptorStruct (11.18.4.5)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FabricDescriptor {
    pub root_public_key: [u8; EC_POINT_LEN_BYTES],
    pub vendor_id: u16,
    pub fabric_id: u64,
    pub node_id: u64,
    pub label: heapless::String<MAX_FABRIC_LABEL_LEN>,
    pub fabric_index: FabricIndex,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fabric_index_range() {
        assert!(FabricIndex::new(0).is_none());
        assert!(FabricIndex::new(255).is_none());
        assert_eq!(FabricIndex::new(254).map(FabricIndex::get), Some(254));
        assert_eq!(FabricIndex::new(254).unwrap().next_wrapping(), FabricIndex::MIN);
    }

    #[test]
    fn test_case_admin_subjects() {
        assert!(is_valid_case_admin_subject(0x0000_0000_0000_0001));
        assert!(is_valid_case_admin_subject(0xFFFF_FFEF_FFFF_FFFF));
        assert!(!is_valid_case_admin_subject(0));
        // Group and temporary local ids are not operational
        assert!(!is_valid_case_admin_subject(0xFFFF_FFFF_FFFF_0001));
        assert!(!is_valid_case_admin_subject(0xFFFF_FFFE_0000_0001));
        // CATs need a non-zero version
        assert!(is_valid_case_admin_subject(0xFFFF_FFFD_ABCD_0001));
        assert!(!is_valid_case_admin_subject(0xFFFF_FFFD_ABCD_0000));
    }

    #[test]
    fn test_vendor_ids() {
        assert!(!is_vendor_id_valid_operationally(0));
        assert!(is_vendor_id_valid_operationally(0x1234));
        assert!(is_vendor_id_valid_operationally(0xFFF4));
        assert!(!is_vendor_id_valid_operationally(0xFFF5));
    }
}
