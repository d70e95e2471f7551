use crate::{
    fabric::{FabricDescriptor, FabricIndex, FabricInfo},
    interaction_model::{reporting::AttributeReporter, AttributePath},
    tlv::{Encoder, TagControl, TagLengthValue},
};

use super::CLUSTER_ID;

/// Endpoint hosting the cluster.
pub const ROOT_ENDPOINT: u16 = 0;

#[repr(u16)]
#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attributes {
    Nocs = 0x0000,
    Fabrics = 0x0001,
    SupportedFabrics = 0x0002,
    CommissionedFabrics = 0x0003,
    TrustedRootCertificates = 0x0004,
    CurrentFabricIndex = 0x0005,
}

impl Attributes {
    pub const fn path(self) -> AttributePath {
        AttributePath::new(ROOT_ENDPOINT, CLUSTER_ID as u32, self as u32)
    }
}

/// NOCStruct (11.18.4.4)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NocStruct {
    pub noc: Vec<u8>,
    pub icac: Option<Vec<u8>>,
    pub fabric_index: FabricIndex,
}

impl From<&FabricInfo> for NocStruct {
    fn from(fabric: &FabricInfo) -> Self {
        Self {
            noc: fabric.noc().to_vec(),
            icac: fabric.icac().map(<[u8]>::to_vec),
            fabric_index: fabric.index(),
        }
    }
}

impl NocStruct {
    pub fn to_tlv(&self, encoder: &mut Encoder, tag: TagControl) {
        encoder.start_struct(tag);
        encoder.write(
            TagControl::ContextSpecific(1),
            TagLengthValue::OctetString(&self.noc),
        );
        match &self.icac {
            Some(icac) => encoder.write(
                TagControl::ContextSpecific(2),
                TagLengthValue::OctetString(icac),
            ),
            None => encoder.write(TagControl::ContextSpecific(2), TagLengthValue::Null),
        }
        write_fabric_index(encoder, self.fabric_index);
        encoder.end_container();
    }
}

pub fn write_fabric_descriptor(
    encoder: &mut Encoder,
    tag: TagControl,
    descriptor: &FabricDescriptor,
) {
    encoder.start_struct(tag);
    encoder.write(
        TagControl::ContextSpecific(1),
        TagLengthValue::OctetString(&descriptor.root_public_key),
    );
    encoder.write(
        TagControl::ContextSpecific(2),
        TagLengthValue::Unsigned16(descriptor.vendor_id),
    );
    encoder.write(
        TagControl::ContextSpecific(3),
        TagLengthValue::Unsigned64(descriptor.fabric_id),
    );
    encoder.write(
        TagControl::ContextSpecific(4),
        TagLengthValue::Unsigned64(descriptor.node_id),
    );
    encoder.write(
        TagControl::ContextSpecific(5),
        TagLengthValue::String(descriptor.label.as_str()),
    );
    write_fabric_index(encoder, descriptor.fabric_index);
    encoder.end_container();
}

/// Fabric-scoped structs carry their index under the global tag 0xFE.
fn write_fabric_index(encoder: &mut Encoder, fabric_index: FabricIndex) {
    encoder.write(
        TagControl::ContextSpecific(0xFE),
        TagLengthValue::Unsigned8(fabric_index.get()),
    );
}

/// Mark the attributes derived from the fabric list as changed.
pub(crate) fn report_fabric_attributes(reporter: &dyn AttributeReporter) {
    reporter.attribute_changed(Attributes::Fabrics.path());
    reporter.attribute_changed(Attributes::CommissionedFabrics.path());
}
