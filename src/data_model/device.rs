use crate::cluster::Cluster;

/// Node (7.8)
pub struct Node<'a> {
    pub id: u64,
    pub endpoints: &'a [Endpoint<'a>],
}

impl<'a> Node<'a> {
    /// Endpoints exposing the cluster `cluster_id`, in declaration order.
    pub fn endpoints_with_cluster(&self, cluster_id: u16) -> impl Iterator<Item = u16> + '_ {
        self.endpoints
            .iter()
            .filter(move |endpoint| endpoint.cluster(cluster_id).is_some())
            .map(|endpoint| endpoint.id)
    }
}

pub struct Endpoint<'a> {
    pub id: u16,
    pub device_type: DeviceType,
    pub clusters: &'a [Cluster<'a>],
}

impl<'a> Endpoint<'a> {
    pub fn cluster(&self, id: u16) -> Option<&Cluster<'a>> {
        self.clusters.iter().find(|cluster| cluster.id == id)
    }
}

/// Device Type (7.15)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceType {
    pub device_type: u16,
    pub device_revision: u16,
}
