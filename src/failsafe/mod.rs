//! Fail-safe context (11.10.6.2)
//!
//! While armed, credential changes are staged rather than committed. The
//! context records which of the NOC commands ran so that an expiry can undo
//! exactly what was done.

use core::time::Duration;

use bitflags::bitflags;
use tracing::{error, info, warn};

use crate::{
    config::DeviceConfig,
    fabric::{FabricIndex, FabricTable},
    session_context::SessionManager,
};

#[cfg(feature = "std-tokio")]
pub mod timer;

bitflags! {
    /// Commands already invoked under the current fail-safe.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FailSafeFlags: u8 {
        const ADD_TRUSTED_ROOT = 0x01;
        const CSR_FOR_UPDATE_NOC = 0x02;
        const ADD_NOC = 0x04;
        const UPDATE_NOC = 0x08;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FailSafeError {
    #[error("fail-safe is armed by another fabric")]
    BusyWithOtherAdmin,
}

/// What an expired fail-safe leaves behind for cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailSafeExpiry {
    pub fabric_index: Option<FabricIndex>,
    pub add_noc_invoked: bool,
    pub update_noc_invoked: bool,
}

#[derive(Debug, Clone)]
pub struct FailSafeContext {
    armed: bool,
    fabric_index: Option<FabricIndex>,
    flags: FailSafeFlags,
    deadline: Duration,
    cumulative_deadline: Duration,
    max_cumulative: Duration,
}

impl FailSafeContext {
    pub fn new(config: &DeviceConfig) -> Self {
        Self {
            armed: false,
            fabric_index: None,
            flags: FailSafeFlags::empty(),
            deadline: Duration::ZERO,
            cumulative_deadline: Duration::ZERO,
            max_cumulative: config.max_cumulative_fail_safe,
        }
    }

    /// Arm, or extend, the fail-safe for `fabric` until `now + expiry`.
    ///
    /// Extensions never go past the cumulative limit counted from the
    /// first arming.
    pub fn arm(
        &mut self,
        fabric: Option<FabricIndex>,
        expiry: Duration,
        now: Duration,
    ) -> Result<(), FailSafeError> {
        if self.armed && self.fabric_index != fabric {
            return Err(FailSafeError::BusyWithOtherAdmin);
        }
        if !self.armed {
            self.armed = true;
            self.fabric_index = fabric;
            self.flags = FailSafeFlags::empty();
            self.cumulative_deadline = now + self.max_cumulative;
        }
        self.deadline = (now + expiry).min(self.cumulative_deadline);
        info!(fabric = ?fabric.map(FabricIndex::get), deadline = ?self.deadline, "Fail-safe armed");
        Ok(())
    }

    pub fn disarm(&mut self) {
        if self.armed {
            info!("Fail-safe disarmed");
        }
        self.armed = false;
        self.fabric_index = None;
        self.flags = FailSafeFlags::empty();
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Armed, and by the given accessing fabric (`None` for PASE).
    pub fn is_armed_for(&self, fabric: Option<FabricIndex>) -> bool {
        self.armed && self.fabric_index == fabric
    }

    pub fn fabric_index(&self) -> Option<FabricIndex> {
        self.fabric_index
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.armed.then_some(self.deadline)
    }

    pub fn flags(&self) -> FailSafeFlags {
        self.flags
    }

    pub fn set_add_trusted_root_invoked(&mut self) {
        self.flags.insert(FailSafeFlags::ADD_TRUSTED_ROOT);
    }

    pub fn add_trusted_root_has_been_invoked(&self) -> bool {
        self.flags.contains(FailSafeFlags::ADD_TRUSTED_ROOT)
    }

    pub fn set_csr_request_for_update_noc(&mut self, for_update: bool) {
        self.flags.set(FailSafeFlags::CSR_FOR_UPDATE_NOC, for_update);
    }

    pub fn is_csr_request_for_update_noc(&self) -> bool {
        self.flags.contains(FailSafeFlags::CSR_FOR_UPDATE_NOC)
    }

    /// Record a successful AddNOC; the fail-safe now belongs to the new fabric.
    pub fn set_add_noc_invoked(&mut self, fabric: FabricIndex) {
        self.flags.insert(FailSafeFlags::ADD_NOC);
        self.fabric_index = Some(fabric);
    }

    pub fn add_noc_has_been_invoked(&self) -> bool {
        self.flags.contains(FailSafeFlags::ADD_NOC)
    }

    pub fn set_update_noc_invoked(&mut self) {
        self.flags.insert(FailSafeFlags::UPDATE_NOC);
    }

    pub fn update_noc_has_been_invoked(&self) -> bool {
        self.flags.contains(FailSafeFlags::UPDATE_NOC)
    }

    pub fn noc_command_has_been_invoked(&self) -> bool {
        self.flags
            .intersects(FailSafeFlags::ADD_NOC | FailSafeFlags::UPDATE_NOC)
    }

    /// Expire the fail-safe if its deadline has passed.
    pub fn poll_expiry(&mut self, now: Duration) -> Option<FailSafeExpiry> {
        if self.armed && now >= self.deadline {
            self.force_expiry()
        } else {
            None
        }
    }

    /// Expire the fail-safe now, returning what needs cleaning up.
    pub fn force_expiry(&mut self) -> Option<FailSafeExpiry> {
        if !self.armed {
            return None;
        }
        let expiry = FailSafeExpiry {
            fabric_index: self.fabric_index,
            add_noc_invoked: self.add_noc_has_been_invoked(),
            update_noc_invoked: self.update_noc_has_been_invoked(),
        };
        warn!(?expiry, "Fail-safe expired");
        self.disarm();
        Some(expiry)
    }
}

/// Return the node to its state before the fail-safe was armed.
///
/// A fabric created by AddNOC is deleted outright, an update is reverted in
/// place. Deletion failures are logged, there is nothing left to undo them.
pub fn fail_safe_cleanup(
    expiry: &FailSafeExpiry,
    fabrics: &mut FabricTable<'_>,
    sessions: &mut dyn SessionManager,
) {
    if let Some(fabric) = expiry.fabric_index {
        // Sessions may have been established with the reverted credentials
        if expiry.add_noc_invoked || expiry.update_noc_invoked {
            sessions.expire_all_sessions_for_fabric(fabric);
        }
        if expiry.add_noc_invoked {
            if let Err(err) = fabrics.delete(fabric) {
                error!(%fabric, %err, "Failed to delete fabric on fail-safe expiry");
            }
        }
    }
    fabrics.revert_pending_fabric_data();
}
