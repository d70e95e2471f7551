//! Group key management (4.15.3)
//!
//! Fabrics are installed with their IPK as key set 0, the operational group
//! keys are derived from the epoch keys and the compressed fabric id.

use tracing::debug;

use crate::{
    config::DeviceConfig,
    constants::CRYPTO_SYMMETRIC_KEY_LENGTH_BYTES,
    crypto::{derive_group_operational_key, CryptoError},
    fabric::FabricIndex,
};

pub const MAX_EPOCH_KEYS: usize = 3;

pub type EpochKey = [u8; CRYPTO_SYMMETRIC_KEY_LENGTH_BYTES];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupKeyError {
    #[error("no room for another key set on this fabric")]
    TableFull,
    #[error("a key set needs between 1 and {MAX_EPOCH_KEYS} epoch keys")]
    InvalidEpochKeys,
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityPolicy {
    TrustFirst = 0,
    CacheAndSync = 1,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySet {
    pub id: u16,
    pub policy: SecurityPolicy,
    /// Epoch keys with their start times, oldest first.
    pub epoch_keys: heapless::Vec<(u64, EpochKey), MAX_EPOCH_KEYS>,
}

impl KeySet {
    /// A trust-first key set with a single epoch key valid from time 0, as
    /// the IPK is installed.
    pub fn single(id: u16, key: EpochKey) -> Self {
        let mut epoch_keys = heapless::Vec::new();
        // Capacity is at least one
        let _ = epoch_keys.push((0, key));
        Self {
            id,
            policy: SecurityPolicy::TrustFirst,
            epoch_keys,
        }
    }
}

pub trait GroupDataProvider {
    /// Store `key_set` for `fabric`, replacing a set with the same id.
    fn set_key_set(
        &mut self,
        fabric: FabricIndex,
        compressed_fabric_id: u64,
        key_set: KeySet,
    ) -> Result<(), GroupKeyError>;
    fn remove_fabric(&mut self, fabric: FabricIndex);
    fn key_set_ids(&self, fabric: FabricIndex) -> Vec<u16>;
}

struct StoredKeySet {
    fabric: FabricIndex,
    key_set: KeySet,
    operational_keys: heapless::Vec<EpochKey, MAX_EPOCH_KEYS>,
}

pub struct GroupKeyStore {
    key_sets: Vec<StoredKeySet>,
    key_sets_per_fabric: usize,
}

impl GroupKeyStore {
    pub fn new(config: &DeviceConfig) -> Self {
        Self {
            key_sets: Vec::new(),
            key_sets_per_fabric: config.key_sets_per_fabric,
        }
    }

    /// Operational keys derived for a key set, in epoch key order.
    pub fn operational_keys(&self, fabric: FabricIndex, key_set_id: u16) -> Option<&[EpochKey]> {
        self.key_sets
            .iter()
            .find(|s| s.fabric == fabric && s.key_set.id == key_set_id)
            .map(|s| s.operational_keys.as_slice())
    }

    /// Number of key sets across all fabrics.
    pub fn len(&self) -> usize {
        self.key_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key_sets.is_empty()
    }
}

impl GroupDataProvider for GroupKeyStore {
    fn set_key_set(
        &mut self,
        fabric: FabricIndex,
        compressed_fabric_id: u64,
        key_set: KeySet,
    ) -> Result<(), GroupKeyError> {
        if key_set.epoch_keys.is_empty() {
            return Err(GroupKeyError::InvalidEpochKeys);
        }
        let mut operational_keys = heapless::Vec::new();
        for (_, epoch_key) in key_set.epoch_keys.iter() {
            let key = derive_group_operational_key(epoch_key, compressed_fabric_id)?;
            operational_keys
                .push(key)
                .map_err(|_| GroupKeyError::InvalidEpochKeys)?;
        }

        let stored = StoredKeySet {
            fabric,
            key_set,
            operational_keys,
        };
        if let Some(existing) = self
            .key_sets
            .iter_mut()
            .find(|s| s.fabric == fabric && s.key_set.id == stored.key_set.id)
        {
            *existing = stored;
            return Ok(());
        }
        if self.key_set_ids(fabric).len() >= self.key_sets_per_fabric {
            return Err(GroupKeyError::TableFull);
        }
        debug!(%fabric, key_set = stored.key_set.id, "Key set installed");
        self.key_sets.push(stored);
        Ok(())
    }

    fn remove_fabric(&mut self, fabric: FabricIndex) {
        self.key_sets.retain(|s| s.fabric != fabric);
    }

    fn key_set_ids(&self, fabric: FabricIndex) -> Vec<u16> {
        self.key_sets
            .iter()
            .filter(|s| s.fabric == fabric)
            .map(|s| s.key_set.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipk_derivation_and_removal() {
        let mut store = GroupKeyStore::new(&DeviceConfig::default());
        let fabric = FabricIndex::new(1).unwrap();
        let ipk = [0x4a; CRYPTO_SYMMETRIC_KEY_LENGTH_BYTES];

        store
            .set_key_set(fabric, 0x87E1_B004_E235_A130, KeySet::single(0, ipk))
            .unwrap();
        let keys = store.operational_keys(fabric, 0).unwrap();
        assert_eq!(
            keys,
            &[derive_group_operational_key(&ipk, 0x87E1_B004_E235_A130).unwrap()]
        );
        assert_ne!(keys[0], ipk);

        // Same id replaces
        store
            .set_key_set(fabric, 0x87E1_B004_E235_A130, KeySet::single(0, [1; 16]))
            .unwrap();
        assert_eq!(store.key_set_ids(fabric), vec![0]);

        store.remove_fabric(fabric);
        assert!(store.is_empty());
    }

    #[test]
    fn test_key_sets_per_fabric() {
        let mut config = DeviceConfig::default();
        config.key_sets_per_fabric = 1;
        let mut store = GroupKeyStore::new(&config);
        let fabric = FabricIndex::new(1).unwrap();
        store.set_key_set(fabric, 1, KeySet::single(0, [0; 16])).unwrap();
        assert_eq!(
            store.set_key_set(fabric, 1, KeySet::single(1, [0; 16])),
            Err(GroupKeyError::TableFull)
        );
    }
}
