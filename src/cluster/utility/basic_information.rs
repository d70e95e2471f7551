use crate::{
    acl::Privilege,
    cluster::{
        Cluster, ClusterClassification, ATTR_ATTRIBUTE_LIST, ATTR_CLUSTER_REVISION,
        ATTR_FEATURE_MAP,
    },
    data_model::{Attribute, AttributeQuality},
};

pub const CLUSTER_ID: u16 = 0x0028;

pub const CLUSTER: Cluster<'static> = Cluster {
    id: CLUSTER_ID,
    classification: ClusterClassification::Utility,
    revision: 1,
    features: 0,
    attributes: &[
        ATTR_CLUSTER_REVISION,
        ATTR_FEATURE_MAP,
        ATTR_ATTRIBUTE_LIST,
        Attribute::new(
            Attributes::DataModelRevision as _,
            AttributeQuality::FIXED,
            Privilege::View,
        ),
        Attribute::new(
            Attributes::VendorName as _,
            AttributeQuality::FIXED,
            Privilege::View,
        ),
        Attribute::new(
            Attributes::VendorID as _,
            AttributeQuality::FIXED,
            Privilege::View,
        ),
        Attribute::new(
            Attributes::ProductName as _,
            AttributeQuality::FIXED,
            Privilege::View,
        ),
        Attribute::new(
            Attributes::ProductID as _,
            AttributeQuality::FIXED,
            Privilege::View,
        ),
        Attribute::new(
            Attributes::NodeLabel as _,
            AttributeQuality::empty(),
            Privilege::View,
        ),
        Attribute::new(
            Attributes::CapabilityMinima as _,
            AttributeQuality::FIXED,
            Privilege::View,
        ),
    ],
    commands: &[],
    generated_commands: &[],
};

#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Attributes {
    DataModelRevision = 0x0000,
    VendorName,
    VendorID,
    ProductName,
    ProductID,
    NodeLabel,
    Location,
    HardwareVersion,
    HardwareVersionString,
    SoftwareVersion,
    SoftwareVersionString,
    CapabilityMinima = 0x0013,
}

/// Events of the Basic Information cluster (11.1.6)
#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Events {
    StartUp = 0x00,
    ShutDown = 0x01,
    /// Emitted to a fabric's subscribers just before the fabric is removed.
    Leave = 0x02,
}
