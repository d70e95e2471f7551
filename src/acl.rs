//! Access Control (9.10)
//!
//! Only what fabric provisioning needs: creating the administrator entry of a
//! new fabric and dropping every entry of a fabric that goes away.

use tracing::{debug, warn};

use crate::{config::DeviceConfig, fabric::FabricIndex};

pub const MAX_SUBJECTS_PER_ENTRY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AclError {
    #[error("no room for another entry on this fabric")]
    TableFull,
    #[error("too many subjects in entry")]
    TooManySubjects,
}

#[repr(u8)]
#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Privilege {
    View = 1,
    ProxyView = 2,
    Operate = 3,
    Manage = 4,
    Administer = 5,
}

#[repr(u8)]
#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Pase = 1,
    Case = 2,
    Group = 3,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclEntry {
    pub fabric_index: FabricIndex,
    pub privilege: Privilege,
    pub auth_mode: AuthMode,
    pub subjects: heapless::Vec<u64, MAX_SUBJECTS_PER_ENTRY>,
}

impl AclEntry {
    pub fn new(fabric_index: FabricIndex, privilege: Privilege, auth_mode: AuthMode) -> Self {
        Self {
            fabric_index,
            privilege,
            auth_mode,
            subjects: heapless::Vec::new(),
        }
    }

    /// The entry AddNOC creates: CASE administration for `subject`.
    pub fn admin(fabric_index: FabricIndex, subject: u64) -> Result<Self, AclError> {
        let mut entry = Self::new(fabric_index, Privilege::Administer, AuthMode::Case);
        entry.add_subject(subject)?;
        Ok(entry)
    }

    pub fn add_subject(&mut self, subject: u64) -> Result<(), AclError> {
        self.subjects
            .push(subject)
            .map_err(|_| AclError::TooManySubjects)
    }
}

pub trait AccessControl {
    /// Append an entry to its fabric's list, returning its position there.
    fn create_entry(&mut self, entry: AclEntry) -> Result<usize, AclError>;
    fn delete_all_entries_for_fabric(&mut self, fabric_index: FabricIndex);
    fn entries(&self, fabric_index: FabricIndex) -> Vec<AclEntry>;
}

pub struct AclTable {
    entries: Vec<AclEntry>,
    entries_per_fabric: usize,
}

impl AclTable {
    pub fn new(config: &DeviceConfig) -> Self {
        Self {
            entries: Vec::new(),
            entries_per_fabric: config.acl_entries_per_fabric,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AccessControl for AclTable {
    fn create_entry(&mut self, entry: AclEntry) -> Result<usize, AclError> {
        let position = self
            .entries
            .iter()
            .filter(|e| e.fabric_index == entry.fabric_index)
            .count();
        if position >= self.entries_per_fabric {
            warn!(fabric = %entry.fabric_index, "ACL full");
            return Err(AclError::TableFull);
        }
        debug!(fabric = %entry.fabric_index, privilege = ?entry.privilege, subjects = ?entry.subjects, "ACL entry created");
        self.entries.push(entry);
        Ok(position)
    }

    fn delete_all_entries_for_fabric(&mut self, fabric_index: FabricIndex) {
        self.entries.retain(|e| e.fabric_index != fabric_index);
    }

    fn entries(&self, fabric_index: FabricIndex) -> Vec<AclEntry> {
        self.entries
            .iter()
            .filter(|e| e.fabric_index == fabric_index)
            .cloned()
            .collect()
    }
}
