use core::cell::RefCell;

use tracing::{debug, info};

use crate::cluster::utility::basic_information;
use crate::fabric::FabricIndex;

/// The event-management side of the node, as seen by fabric lifecycle code.
pub trait EventSink {
    /// Emit the Basic Information Leave event on `endpoint`, scoped to `fabric`.
    fn log_leave_event(&self, endpoint: u16, fabric: FabricIndex);
    /// Attempt delivery of queued events for `fabric` right away.
    fn schedule_urgent_delivery(&self, fabric: FabricIndex);
    /// Drop any event state kept on behalf of `fabric`.
    fn fabric_removed(&self, fabric: FabricIndex);
}

impl<T> EventSink for &T
where
    T: EventSink,
{
    fn log_leave_event(&self, endpoint: u16, fabric: FabricIndex) {
        (**self).log_leave_event(endpoint, fabric)
    }

    fn schedule_urgent_delivery(&self, fabric: FabricIndex) {
        (**self).schedule_urgent_delivery(fabric)
    }

    fn fabric_removed(&self, fabric: FabricIndex) {
        (**self).fabric_removed(fabric)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRecord {
    pub number: u64,
    pub endpoint: u16,
    pub cluster: u32,
    pub event: u32,
    pub fabric: FabricIndex,
}

#[derive(Default)]
struct EventLogState {
    next_number: u64,
    queued: Vec<EventRecord>,
    delivered: Vec<EventRecord>,
}

/// Event buffer holding fabric-scoped events until a subscriber picks them up.
#[derive(Default)]
pub struct EventLog {
    state: RefCell<EventLogState>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queued(&self) -> Vec<EventRecord> {
        self.state.borrow().queued.clone()
    }

    pub fn delivered(&self) -> Vec<EventRecord> {
        self.state.borrow().delivered.clone()
    }
}

impl EventSink for EventLog {
    fn log_leave_event(&self, endpoint: u16, fabric: FabricIndex) {
        let mut state = self.state.borrow_mut();
        let number = state.next_number;
        state.next_number += 1;
        debug!(endpoint, %fabric, number, "Leave event");
        state.queued.push(EventRecord {
            number,
            endpoint,
            cluster: basic_information::CLUSTER_ID as u32,
            event: basic_information::Events::Leave as u32,
            fabric,
        });
    }

    fn schedule_urgent_delivery(&self, fabric: FabricIndex) {
        let mut state = self.state.borrow_mut();
        let (ready, rest): (Vec<_>, Vec<_>) =
            state.queued.drain(..).partition(|e| e.fabric == fabric);
        state.queued = rest;
        info!(%fabric, count = ready.len(), "Flushing events");
        state.delivered.extend(ready);
    }

    fn fabric_removed(&self, fabric: FabricIndex) {
        self.state
            .borrow_mut()
            .queued
            .retain(|e| e.fabric != fabric);
    }
}
