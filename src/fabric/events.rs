use super::{FabricIndex, FabricTable};

/// A change to the fabric table, dispatched to every registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FabricEvent {
    /// Dispatched before anything about the fabric is removed, the fabric is
    /// still readable from the table.
    WillBeRemoved(FabricIndex),
    Removed(FabricIndex),
    /// Label change, or pending NOC data staged but not yet committed.
    Updated(FabricIndex),
    Committed(FabricIndex),
}

impl FabricEvent {
    pub fn fabric_index(&self) -> FabricIndex {
        match *self {
            FabricEvent::WillBeRemoved(index)
            | FabricEvent::Removed(index)
            | FabricEvent::Updated(index)
            | FabricEvent::Committed(index) => index,
        }
    }
}

/// Observer of fabric table changes.
///
/// Listeners run synchronously on the thread mutating the table and get
/// read access to it, they must not try to mutate it.
pub trait FabricListener {
    fn on_fabric_event(&self, table: &FabricTable<'_>, event: &FabricEvent);
}

impl<T> FabricListener for &T
where
    T: FabricListener,
{
    fn on_fabric_event(&self, table: &FabricTable<'_>, event: &FabricEvent) {
        (**self).on_fabric_event(table, event)
    }
}
