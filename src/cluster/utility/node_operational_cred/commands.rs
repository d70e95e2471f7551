//! Command payloads of the Node Operational Credentials cluster (11.18.6)
//!
//! Requests arrive decoded, responses are encoded to TLV with [`Encoder`].

use crate::{
    constants::EC_SIGNATURE_LEN_BYTES,
    tlv::{Encoder, TagControl, TagLengthValue},
};

use super::status::NocResponse;

#[repr(u8)]
#[derive(FromPrimitive, ToPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    AttestationRequest = 0x00,
    CertificateChainRequest = 0x02,
    CsrRequest = 0x04,
    AddNoc = 0x06,
    UpdateNoc = 0x07,
    UpdateFabricLabel = 0x09,
    RemoveFabric = 0x0a,
    AddTrustedRootCertificate = 0x0b,
}

#[repr(u8)]
#[derive(FromPrimitive, ToPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RespCommands {
    AttestationResponse = 0x01,
    CertificateChainResponse = 0x03,
    CsrResponse = 0x05,
    NocResponse = 0x08,
}

/// CertificateChainTypeEnum (11.18.4.1)
#[repr(u8)]
#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateChainType {
    Dac = 1,
    Pai = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsrRequest<'r> {
    pub nonce: &'r [u8],
    pub is_for_update_noc: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddNocRequest<'r> {
    pub noc: &'r [u8],
    pub icac: Option<&'r [u8]>,
    pub ipk: &'r [u8],
    pub case_admin_subject: u64,
    pub admin_vendor_id: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateNocRequest<'r> {
    pub noc: &'r [u8],
    pub icac: Option<&'r [u8]>,
}

/// A decoded command addressed to the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NocCommand<'r> {
    AttestationRequest { nonce: &'r [u8] },
    CertificateChainRequest { certificate_type: u8 },
    CsrRequest(CsrRequest<'r>),
    AddNoc(AddNocRequest<'r>),
    UpdateNoc(UpdateNocRequest<'r>),
    UpdateFabricLabel { label: &'r str },
    RemoveFabric { fabric_index: u8 },
    AddTrustedRootCertificate { root_cert: &'r [u8] },
}

impl<'r> NocCommand<'r> {
    pub fn id(&self) -> Commands {
        match self {
            NocCommand::AttestationRequest { .. } => Commands::AttestationRequest,
            NocCommand::CertificateChainRequest { .. } => Commands::CertificateChainRequest,
            NocCommand::CsrRequest(_) => Commands::CsrRequest,
            NocCommand::AddNoc(_) => Commands::AddNoc,
            NocCommand::UpdateNoc(_) => Commands::UpdateNoc,
            NocCommand::UpdateFabricLabel { .. } => Commands::UpdateFabricLabel,
            NocCommand::RemoveFabric { .. } => Commands::RemoveFabric,
            NocCommand::AddTrustedRootCertificate { .. } => Commands::AddTrustedRootCertificate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationResponse {
    pub attestation_elements: Vec<u8>,
    pub attestation_signature: [u8; EC_SIGNATURE_LEN_BYTES],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateChainResponse {
    pub certificate: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrResponse {
    pub nocsr_elements: Vec<u8>,
    pub attestation_signature: [u8; EC_SIGNATURE_LEN_BYTES],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NocCommandResponse {
    Attestation(AttestationResponse),
    CertificateChain(CertificateChainResponse),
    Csr(CsrResponse),
    Noc(NocResponse),
    /// Plain success status, no response command.
    Success,
}

impl NocCommandResponse {
    pub fn command_id(&self) -> Option<RespCommands> {
        match self {
            NocCommandResponse::Attestation(_) => Some(RespCommands::AttestationResponse),
            NocCommandResponse::CertificateChain(_) => Some(RespCommands::CertificateChainResponse),
            NocCommandResponse::Csr(_) => Some(RespCommands::CsrResponse),
            NocCommandResponse::Noc(_) => Some(RespCommands::NocResponse),
            NocCommandResponse::Success => None,
        }
    }

    /// Encode the response command fields, nothing for [`Self::Success`].
    pub fn to_tlv(&self, encoder: &mut Encoder, tag: TagControl) {
        let (first, second): (&[u8], Option<&[u8]>) = match self {
            NocCommandResponse::Noc(response) => return response.to_tlv(encoder, tag),
            NocCommandResponse::Success => return,
            NocCommandResponse::Attestation(response) => (
                response.attestation_elements.as_slice(),
                Some(response.attestation_signature.as_slice()),
            ),
            NocCommandResponse::CertificateChain(response) => {
                (response.certificate.as_slice(), None)
            }
            NocCommandResponse::Csr(response) => (
                response.nocsr_elements.as_slice(),
                Some(response.attestation_signature.as_slice()),
            ),
        };
        encoder.start_struct(tag);
        encoder.write(TagControl::ContextSpecific(0), TagLengthValue::OctetString(first));
        if let Some(second) = second {
            encoder.write(
                TagControl::ContextSpecific(1),
                TagLengthValue::OctetString(second),
            );
        }
        encoder.end_container();
    }
}
