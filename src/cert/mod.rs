//! Operational certificates in their X.509 form (6.5)
//!
//! Matter identities live in the subject DN under the `1.3.6.1.4.1.37244.1`
//! arc. Only what the credential commands need is extracted: the kind of
//! certificate, its node and fabric ids, and the subject public key.

use core::fmt;

use p256::ecdsa::{signature::Verifier, Signature, VerifyingKey};
use x509_cert::{
    attr::AttributeType,
    der::{Decode, Encode},
    name::Name,
    Certificate,
};

use crate::constants::{EC_POINT_LEN_BYTES, MAX_CERT_LEN};

pub mod issue;

pub const OID_MATTER_NODE_ID: AttributeType = AttributeType::new_unwrap("1.3.6.1.4.1.37244.1.1");
pub const OID_MATTER_FIRMWARE_SIGNING_ID: AttributeType =
    AttributeType::new_unwrap("1.3.6.1.4.1.37244.1.2");
pub const OID_MATTER_ICAC_ID: AttributeType = AttributeType::new_unwrap("1.3.6.1.4.1.37244.1.3");
pub const OID_MATTER_RCAC_ID: AttributeType = AttributeType::new_unwrap("1.3.6.1.4.1.37244.1.4");
pub const OID_MATTER_FABRIC_ID: AttributeType =
    AttributeType::new_unwrap("1.3.6.1.4.1.37244.1.5");

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CertError {
    #[error("certificate longer than {MAX_CERT_LEN} bytes")]
    TooLong,
    #[error("certificate is not valid DER")]
    Malformed,
    #[error("certificate carries no Matter identity")]
    UnsupportedFormat,
    #[error("expected a {expected:?} certificate, got {found:?}")]
    WrongType { expected: CertKind, found: CertKind },
    #[error("subject public key is not an uncompressed P-256 point")]
    InvalidPublicKey,
    #[error("malformed Matter DN attribute")]
    InvalidDnValue,
    #[error("issuer does not match the signing certificate")]
    IssuerMismatch,
    #[error("signature does not verify")]
    SignatureMismatch,
    #[error("node certificate has no fabric id")]
    MissingFabricId,
    #[error("fabric id differs from the issuer's")]
    FabricIdMismatch,
}

/// Position of a certificate in an operational chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertKind {
    Root,
    Intermediate,
    Node,
}

/// A parsed operational certificate.
#[derive(Clone)]
pub struct Cert {
    der: Vec<u8>,
    inner: Certificate,
    kind: CertKind,
    node_id: Option<u64>,
    fabric_id: Option<u64>,
    public_key: [u8; EC_POINT_LEN_BYTES],
}

impl Cert {
    pub fn new(der: &[u8]) -> Result<Self, CertError> {
        if der.len() > MAX_CERT_LEN {
            return Err(CertError::TooLong);
        }
        let inner = Certificate::from_der(der).map_err(|_| CertError::Malformed)?;

        let mut node_id = None;
        let mut fabric_id = None;
        let mut is_icac = false;
        let mut is_rcac = false;
        for rdn in inner.tbs_certificate.subject.0.iter() {
            for atv in rdn.0.iter() {
                if atv.oid == OID_MATTER_NODE_ID {
                    node_id = Some(parse_dn_u64(atv.value.value())?);
                } else if atv.oid == OID_MATTER_FABRIC_ID {
                    fabric_id = Some(parse_dn_u64(atv.value.value())?);
                } else if atv.oid == OID_MATTER_ICAC_ID {
                    is_icac = true;
                } else if atv.oid == OID_MATTER_RCAC_ID {
                    is_rcac = true;
                }
            }
        }
        let kind = match (node_id.is_some(), is_icac, is_rcac) {
            (true, _, _) => CertKind::Node,
            (false, true, _) => CertKind::Intermediate,
            (false, false, true) => CertKind::Root,
            _ => return Err(CertError::UnsupportedFormat),
        };

        let key = inner
            .tbs_certificate
            .subject_public_key_info
            .subject_public_key
            .raw_bytes();
        if key.len() != EC_POINT_LEN_BYTES || key[0] != 0x04 {
            return Err(CertError::InvalidPublicKey);
        }
        let mut public_key = [0u8; EC_POINT_LEN_BYTES];
        public_key.copy_from_slice(key);

        Ok(Self {
            der: der.to_vec(),
            inner,
            kind,
            node_id,
            fabric_id,
            public_key,
        })
    }

    pub fn kind(&self) -> CertKind {
        self.kind
    }

    pub fn node_id(&self) -> Option<u64> {
        self.node_id
    }

    pub fn fabric_id(&self) -> Option<u64> {
        self.fabric_id
    }

    pub fn public_key(&self) -> &[u8; EC_POINT_LEN_BYTES] {
        &self.public_key
    }

    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    pub fn subject(&self) -> &Name {
        &self.inner.tbs_certificate.subject
    }

    pub fn issuer(&self) -> &Name {
        &self.inner.tbs_certificate.issuer
    }

    fn expect_kind(&self, expected: CertKind) -> Result<(), CertError> {
        if self.kind != expected {
            return Err(CertError::WrongType {
                expected,
                found: self.kind,
            });
        }
        Ok(())
    }

    /// Check that `issuer` issued and signed this certificate.
    pub fn verify_signed_by(&self, issuer: &Cert) -> Result<(), CertError> {
        if self.issuer() != issuer.subject() {
            return Err(CertError::IssuerMismatch);
        }
        let verifying_key = VerifyingKey::from_sec1_bytes(issuer.public_key())
            .map_err(|_| CertError::InvalidPublicKey)?;
        let signature = Signature::from_der(self.inner.signature.raw_bytes())
            .map_err(|_| CertError::SignatureMismatch)?;
        let tbs = self
            .inner
            .tbs_certificate
            .to_der()
            .map_err(|_| CertError::Malformed)?;
        verifying_key
            .verify(&tbs, &signature)
            .map_err(|_| CertError::SignatureMismatch)
    }
}

impl fmt::Debug for Cert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cert")
            .field("kind", &self.kind)
            .field("node_id", &self.node_id.map(|v| format!("{v:016X}")))
            .field("fabric_id", &self.fabric_id.map(|v| format!("{v:016X}")))
            .finish()
    }
}

impl fmt::Display for Cert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(node_id) = self.node_id {
            write!(f, " node={node_id:016X}")?;
        }
        if let Some(fabric_id) = self.fabric_id {
            write!(f, " fabric={fabric_id:016X}")?;
        }
        Ok(())
    }
}

/// Matter DN values are 16 upper-case hex digits in a UTF8String.
fn parse_dn_u64(value: &[u8]) -> Result<u64, CertError> {
    if value.len() != 16 {
        return Err(CertError::InvalidDnValue);
    }
    let value = core::str::from_utf8(value).map_err(|_| CertError::InvalidDnValue)?;
    u64::from_str_radix(value, 16).map_err(|_| CertError::InvalidDnValue)
}

/// Structural validation of a root CA certificate before it can be trusted.
pub fn validate_rcac(der: &[u8]) -> Result<Cert, CertError> {
    let rcac = Cert::new(der)?;
    rcac.expect_kind(CertKind::Root)?;
    // Self-issued and self-signed
    rcac.verify_signed_by(&rcac)?;
    Ok(rcac)
}

/// Validate a NOC, optionally through an ICAC, up to `rcac`.
pub fn validate_chain(noc: &Cert, icac: Option<&Cert>, rcac: &Cert) -> Result<(), CertError> {
    noc.expect_kind(CertKind::Node)?;
    rcac.expect_kind(CertKind::Root)?;
    let noc_fabric_id = noc.fabric_id().ok_or(CertError::MissingFabricId)?;

    match icac {
        Some(icac) => {
            icac.expect_kind(CertKind::Intermediate)?;
            noc.verify_signed_by(icac)?;
            icac.verify_signed_by(rcac)?;
            check_issuer_fabric(icac, noc_fabric_id)?;
        }
        None => noc.verify_signed_by(rcac)?,
    }
    check_issuer_fabric(rcac, noc_fabric_id)
}

/// CA certificates may pin a fabric id; when they do it must be the NOC's.
fn check_issuer_fabric(issuer: &Cert, fabric_id: u64) -> Result<(), CertError> {
    match issuer.fabric_id() {
        Some(id) if id != fabric_id => Err(CertError::FabricIdMismatch),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::issue::CertIssuer;
    use super::*;
    use crate::crypto::KeyPair;

    #[test]
    fn test_root_is_self_signed() {
        let root = CertIssuer::new_root(1, Some(0xFAB1)).unwrap();
        let rcac = validate_rcac(root.cert()).unwrap();
        assert_eq!(rcac.kind(), CertKind::Root);
        assert_eq!(rcac.fabric_id(), Some(0xFAB1));
    }

    #[test]
    fn test_node_cert_is_not_a_root() {
        let root = CertIssuer::new_root(1, Some(0xFAB1)).unwrap();
        let key = KeyPair::new();
        let noc = root.issue_noc(&key.public_key(), 0x1122, 0xFAB1).unwrap();
        assert_eq!(
            validate_rcac(&noc).unwrap_err(),
            CertError::WrongType {
                expected: CertKind::Root,
                found: CertKind::Node
            }
        );
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert_eq!(validate_rcac(&[0x30, 0x03, 0x01]).unwrap_err(), CertError::Malformed);
        assert_eq!(Cert::new(&[0u8; 401]).unwrap_err(), CertError::TooLong);
    }

    #[test]
    fn test_chain_with_and_without_icac() {
        let root = CertIssuer::new_root(1, Some(0xFAB1)).unwrap();
        let rcac = Cert::new(root.cert()).unwrap();
        let key = KeyPair::new();

        let noc = Cert::new(&root.issue_noc(&key.public_key(), 0x1122, 0xFAB1).unwrap()).unwrap();
        validate_chain(&noc, None, &rcac).unwrap();
        assert_eq!(noc.node_id(), Some(0x1122));
        assert_eq!(noc.public_key(), &key.public_key());

        let ica = root.issue_intermediate(2, Some(0xFAB1)).unwrap();
        let icac = Cert::new(ica.cert()).unwrap();
        let noc = Cert::new(&ica.issue_noc(&key.public_key(), 0x1122, 0xFAB1).unwrap()).unwrap();
        validate_chain(&noc, Some(&icac), &rcac).unwrap();
        // Skipping the ICAC breaks the chain
        assert_eq!(
            validate_chain(&noc, None, &rcac).unwrap_err(),
            CertError::IssuerMismatch
        );
    }

    #[test]
    fn test_chain_from_foreign_root() {
        let root = CertIssuer::new_root(1, Some(0xFAB1)).unwrap();
        let other = CertIssuer::new_root(1, Some(0xFAB1)).unwrap();
        let key = KeyPair::new();
        let noc = Cert::new(&other.issue_noc(&key.public_key(), 1, 0xFAB1).unwrap()).unwrap();
        // Same DN, different key
        assert_eq!(
            validate_chain(&noc, None, &Cert::new(root.cert()).unwrap()).unwrap_err(),
            CertError::SignatureMismatch
        );
    }

    #[test]
    fn test_fabric_id_must_match_issuer() {
        let root = CertIssuer::new_root(1, Some(0xFAB1)).unwrap();
        let key = KeyPair::new();
        let noc = Cert::new(&root.issue_noc(&key.public_key(), 1, 0xFAB2).unwrap()).unwrap();
        assert_eq!(
            validate_chain(&noc, None, &Cert::new(root.cert()).unwrap()).unwrap_err(),
            CertError::FabricIdMismatch
        );
    }
}
