//! Side effects of fabric table changes, whichever command caused them.

use core::cell::RefCell;

use tracing::{debug, info, warn};

use crate::{
    acl::AccessControl,
    cluster::utility::basic_information,
    data_model::device::Node,
    fabric::{FabricEvent, FabricListener, FabricTable},
    group_keys::GroupDataProvider,
    interaction_model::{events::EventSink, reporting::AttributeReporter},
    transport::{operational_instances, Advertiser},
};

use super::attributes::report_fabric_attributes;

/// Keeps subscribers, event delivery and operational advertisement in step
/// with the fabric table.
pub struct FabricChangeNotifier<'a> {
    node: &'a Node<'a>,
    reporter: &'a dyn AttributeReporter,
    events: &'a dyn EventSink,
    advertiser: &'a dyn Advertiser,
}

impl<'a> FabricChangeNotifier<'a> {
    pub fn new(
        node: &'a Node<'a>,
        reporter: &'a dyn AttributeReporter,
        events: &'a dyn EventSink,
        advertiser: &'a dyn Advertiser,
    ) -> Self {
        Self {
            node,
            reporter,
            events,
            advertiser,
        }
    }
}

impl<'a> FabricListener for FabricChangeNotifier<'a> {
    fn on_fabric_event(&self, table: &FabricTable<'_>, event: &FabricEvent) {
        match *event {
            FabricEvent::WillBeRemoved(fabric) => {
                // The fabric's subscriptions die with it, deliver Leave first
                for endpoint in self.node.endpoints_with_cluster(basic_information::CLUSTER_ID) {
                    self.events.log_leave_event(endpoint, fabric);
                }
                self.events.schedule_urgent_delivery(fabric);
            }
            FabricEvent::Removed(fabric) => {
                info!(%fabric, "Fabric removed");
                if let Err(err) = self.advertiser.restart(&operational_instances(table)) {
                    warn!(%err, "Failed to restart operational advertisement");
                }
                self.events.fabric_removed(fabric);
                report_fabric_attributes(self.reporter);
            }
            FabricEvent::Updated(fabric) => {
                debug!(%fabric, "Fabric updated");
                report_fabric_attributes(self.reporter);
            }
            FabricEvent::Committed(fabric) => {
                info!(%fabric, "Fabric committed to storage");
            }
        }
    }
}

/// Drops the group keys and access control entries of removed fabrics.
pub struct FabricStateCleanup<'a> {
    groups: &'a RefCell<dyn GroupDataProvider>,
    acl: &'a RefCell<dyn AccessControl>,
}

impl<'a> FabricStateCleanup<'a> {
    pub fn new(
        groups: &'a RefCell<dyn GroupDataProvider>,
        acl: &'a RefCell<dyn AccessControl>,
    ) -> Self {
        Self { groups, acl }
    }
}

impl<'a> FabricListener for FabricStateCleanup<'a> {
    fn on_fabric_event(&self, _table: &FabricTable<'_>, event: &FabricEvent) {
        if let FabricEvent::Removed(fabric) = *event {
            self.groups.borrow_mut().remove_fabric(fabric);
            self.acl.borrow_mut().delete_all_entries_for_fabric(fabric);
        }
    }
}
