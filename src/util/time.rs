use core::time::Duration;

/// A clock source returning the time since the UNIX epoch.
pub type Epoch = fn() -> Duration;

#[cfg(feature = "std")]
pub fn sys_epoch() -> Duration {
    use std::time::SystemTime;
    // A clock set before 1970 reads as the epoch itself
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
}

#[cfg(not(feature = "std"))]
pub fn sys_epoch() -> Duration {
    unimplemented!("A clock source is not yet implemented")
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::constants::MATTER_EPOCH_SECS;

    #[test]
    fn test_sys_epoch_is_past_matter_epoch() {
        let clock: Epoch = sys_epoch;
        assert!(clock().as_secs() > MATTER_EPOCH_SECS);
    }
}
