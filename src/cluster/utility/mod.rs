pub mod basic_information;
pub mod general_commissioning;
pub mod node_operational_cred;
