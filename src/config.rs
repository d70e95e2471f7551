use core::time::Duration;

use crate::constants::*;

/// Runtime limits of the node.
///
/// Everything here has a protocol default; devices with more storage can
/// raise the fabric and ACL capacities.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Reported through the SupportedFabrics attribute.
    pub supported_fabrics: u8,
    pub acl_entries_per_fabric: usize,
    pub key_sets_per_fabric: usize,
    /// Used by ArmFailSafe when the commissioner does not ask for a value.
    pub fail_safe_expiry: Duration,
    /// Upper bound on how long a single fail-safe may stay armed in total.
    pub max_cumulative_fail_safe: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            supported_fabrics: DEFAULT_SUPPORTED_FABRICS,
            acl_entries_per_fabric: DEFAULT_ACL_ENTRIES_PER_FABRIC,
            key_sets_per_fabric: DEFAULT_KEY_SETS_PER_FABRIC,
            fail_safe_expiry: Duration::from_secs(DEFAULT_FAIL_SAFE_EXPIRY_SECS as u64),
            max_cumulative_fail_safe: Duration::from_secs(
                DEFAULT_MAX_CUMULATIVE_FAIL_SAFE_SECS as u64,
            ),
        }
    }
}

impl DeviceConfig {
    pub fn with_supported_fabrics(mut self, supported_fabrics: u8) -> Self {
        self.supported_fabrics = supported_fabrics;
        self
    }

    pub fn with_acl_entries_per_fabric(mut self, entries: usize) -> Self {
        self.acl_entries_per_fabric = entries;
        self
    }
}
