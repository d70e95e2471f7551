//! Server side of Matter's Node Operational Credentials provisioning.
//!
//! A commissioner adds the node to fabrics, or updates and removes them,
//! through the Node Operational Credentials and General Commissioning
//! clusters. Everything the clusters touch (fabric table, fail-safe, group
//! keys, access control, sessions, reporting, advertisement) is passed in
//! explicitly so a node can wire its own implementations.

#[macro_use]
extern crate num_derive;
extern crate alloc;

pub mod acl;
pub mod cert;
/// Cluster definitions and servers
pub mod cluster;
pub mod config;
pub mod constants;
pub mod crypto;
pub mod data_model;
pub mod dev_att;
pub mod exchange;
pub mod fabric;
pub mod failsafe;
pub mod group_keys;
pub mod interaction_model;
pub mod session_context;
pub mod tlv;
pub mod transport;
pub mod util;
