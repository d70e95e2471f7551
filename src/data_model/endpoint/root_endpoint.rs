use crate::{
    cluster::{
        utility::{basic_information, general_commissioning, node_operational_cred},
        Cluster,
    },
    data_model::{device::Endpoint, device_type::DEVICE_TYPE_ROOT_NODE},
};

pub const CLUSTERS: [Cluster<'static>; 3] = [
    basic_information::CLUSTER,
    general_commissioning::CLUSTER,
    node_operational_cred::CLUSTER,
];

/// The utility clusters of the root endpoint.
pub const fn endpoint(id: u16) -> Endpoint<'static> {
    Endpoint {
        id,
        device_type: DEVICE_TYPE_ROOT_NODE,
        clusters: &CLUSTERS,
    }
}
