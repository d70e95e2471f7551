use crate::{
    acl::Privilege,
    data_model::{Attribute, AttributeQuality},
    interaction_model::ImStatus,
    tlv::{Encoder, TagControl, TagLengthValue},
};

pub mod utility;

pub struct Cluster<'a> {
    pub id: u16,
    pub classification: ClusterClassification,
    pub revision: u8,
    pub features: u32,
    pub attributes: &'a [Attribute],
    /// Accepted command ids.
    pub commands: &'a [u8],
    /// Ids of the response commands the cluster sends.
    pub generated_commands: &'a [u8],
}

impl<'a> Cluster<'a> {
    pub const fn new(
        id: u16,
        classification: ClusterClassification,
        revision: u8,
        features: u32,
        attributes: &'a [Attribute],
        commands: &'a [u8],
        generated_commands: &'a [u8],
    ) -> Self {
        Self {
            id,
            classification,
            revision,
            features,
            attributes,
            commands,
            generated_commands,
        }
    }

    pub fn attribute(&self, id: u16) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.id == id)
    }

    pub fn accepts_command(&self, id: u8) -> bool {
        self.commands.contains(&id)
    }

    /// Ids of the AttributeList global attribute.
    pub fn attribute_list(&self) -> impl Iterator<Item = u16> + '_ {
        self.attributes.iter().map(|attr| attr.id)
    }

    /// Encode a global attribute, these are derived from the cluster
    /// description alone.
    pub fn read_global(
        &self,
        attr: GlobalAttributes,
        tag: TagControl,
        encoder: &mut Encoder,
    ) -> Result<(), ImStatus> {
        match attr {
            GlobalAttributes::ClusterRevision => {
                encoder.write(tag, TagLengthValue::Unsigned16(self.revision as u16))
            }
            GlobalAttributes::FeatureMap => {
                encoder.write(tag, TagLengthValue::Unsigned32(self.features))
            }
            GlobalAttributes::AttributeList => {
                write_id_list(encoder, tag, self.attribute_list().map(u32::from))
            }
            GlobalAttributes::AcceptedCommandList => {
                write_id_list(encoder, tag, self.commands.iter().map(|&id| u32::from(id)))
            }
            GlobalAttributes::GeneratedCommandList => write_id_list(
                encoder,
                tag,
                self.generated_commands.iter().map(|&id| u32::from(id)),
            ),
            GlobalAttributes::EventList => write_id_list(encoder, tag, core::iter::empty()),
            GlobalAttributes::FabricIndex => return Err(ImStatus::UnsupportedAttribute),
        }
        Ok(())
    }
}

fn write_id_list(encoder: &mut Encoder, tag: TagControl, ids: impl Iterator<Item = u32>) {
    encoder.start_array(tag);
    for id in ids {
        encoder.write(TagControl::Anonymous, TagLengthValue::Unsigned32(id));
    }
    encoder.end_container();
}

#[repr(u16)]
#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalAttributes {
    ClusterRevision = 0xFFFD,
    FeatureMap = 0xFFFC,
    AttributeList = 0xFFFB,
    EventList = 0xFFFA,
    AcceptedCommandList = 0xFFF9,
    GeneratedCommandList = 0xFFF8,
    FabricIndex = 0xFE,
}

/// The classification of the cluster (7.10.8)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterClassification {
    /// Used for the primary operation of the endpoint.
    /// Supports one or more persistent application interactions between a client and server.
    Application,
    /// Used for configuration, discovery, addressing, diagnosing, monitoring, etc.
    Utility,
}

// Global attributes
pub const ATTR_CLUSTER_REVISION: Attribute = Attribute::new(
    GlobalAttributes::ClusterRevision as _,
    AttributeQuality::FIXED,
    Privilege::View,
);
pub const ATTR_FEATURE_MAP: Attribute = Attribute::new(
    GlobalAttributes::FeatureMap as _,
    AttributeQuality::FIXED,
    Privilege::View,
);
pub const ATTR_ATTRIBUTE_LIST: Attribute = Attribute::new(
    GlobalAttributes::AttributeList as _,
    AttributeQuality::FIXED.union(AttributeQuality::LIST),
    Privilege::View,
);

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;
    use crate::cluster::utility::node_operational_cred;

    #[test]
    fn test_global_attributes() {
        let cluster = node_operational_cred::CLUSTER;
        let mut encoder = Encoder::default();
        cluster
            .read_global(
                GlobalAttributes::GeneratedCommandList,
                TagControl::Anonymous,
                &mut encoder,
            )
            .unwrap();
        assert_eq!(
            encoder.as_slice(),
            &hex!("16 0601000000 0603000000 0605000000 0608000000 18")
        );

        let mut encoder = Encoder::default();
        cluster
            .read_global(
                GlobalAttributes::ClusterRevision,
                TagControl::ContextSpecific(2),
                &mut encoder,
            )
            .unwrap();
        assert_eq!(encoder.as_slice(), &hex!("2502 0100"));

        assert_eq!(
            cluster.read_global(
                GlobalAttributes::FabricIndex,
                TagControl::Anonymous,
                &mut Encoder::default()
            ),
            Err(ImStatus::UnsupportedAttribute)
        );
        assert!(cluster.accepts_command(0x0b));
        assert!(!cluster.accepts_command(0x01));
    }
}
