use core::{
    cell::{Cell, RefCell},
    fmt::Write,
};

use tracing::debug;

use crate::fabric::FabricTable;

#[cfg(feature = "mdns")]
pub mod mdns;

pub const DNS_MATTER_PORT: u16 = 5540;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdvertiseError {
    #[error("failed to start the responder: {0}")]
    Responder(String),
}

/// Operational discovery record of one fabric (4.3.2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationalInstance {
    pub compressed_fabric_id: u64,
    pub node_id: u64,
}

impl OperationalInstance {
    /// Instance name, `<compressed fabric id>-<node id>` in upper-case hex.
    pub fn name(&self) -> heapless::String<33> {
        let mut name = heapless::String::new();
        // 16 + 1 + 16 characters always fit
        let _ = write!(
            &mut name,
            "{:016X}-{:016X}",
            self.compressed_fabric_id, self.node_id
        );
        name
    }
}

/// One instance per fabric, in table order.
pub fn operational_instances(fabrics: &FabricTable<'_>) -> Vec<OperationalInstance> {
    fabrics
        .iter()
        .map(|fabric| OperationalInstance {
            compressed_fabric_id: fabric.compressed_fabric_id(),
            node_id: fabric.node_id(),
        })
        .collect()
}

/// Publishes operational DNS-SD records.
pub trait Advertiser {
    /// Replace the advertised records with `instances`.
    fn restart(&self, instances: &[OperationalInstance]) -> Result<(), AdvertiseError>;
}

impl<T> Advertiser for &T
where
    T: Advertiser,
{
    fn restart(&self, instances: &[OperationalInstance]) -> Result<(), AdvertiseError> {
        (**self).restart(instances)
    }
}

/// Keeps the advertised set in memory, for nodes without a responder.
#[derive(Default)]
pub struct AdvertisedInstances {
    instances: RefCell<Vec<OperationalInstance>>,
    restarts: Cell<usize>,
}

impl AdvertisedInstances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instances(&self) -> Vec<OperationalInstance> {
        self.instances.borrow().clone()
    }

    pub fn restarts(&self) -> usize {
        self.restarts.get()
    }
}

impl Advertiser for AdvertisedInstances {
    fn restart(&self, instances: &[OperationalInstance]) -> Result<(), AdvertiseError> {
        debug!(count = instances.len(), "Advertising operational instances");
        *self.instances.borrow_mut() = instances.to_vec();
        self.restarts.set(self.restarts.get() + 1);
        Ok(())
    }
}
