//! Minting of operational certificates.
//!
//! Commissioners hold a root (and optionally an intermediate) CA and issue
//! NOCs for the public keys found in the CSRs they receive.

use core::time::Duration;

use x509_cert::{
    attr::{AttributeType, AttributeTypeAndValue},
    certificate::{TbsCertificate, Version},
    der::{
        asn1::{BitString, UtcTime},
        Any, Decode, Encode, Tag,
    },
    name::{Name, RdnSequence, RelativeDistinguishedName},
    request::CertReq,
    serial_number::SerialNumber,
    spki::AlgorithmIdentifier,
    time::{Time, Validity},
    Certificate,
};

use crate::constants::EC_POINT_LEN_BYTES;
use crate::crypto::{
    fill_random,
    keypair::{spki_for, OID_ECDSA_WITH_SHA256},
    CryptoError, KeyPair,
};

use super::{OID_MATTER_FABRIC_ID, OID_MATTER_ICAC_ID, OID_MATTER_NODE_ID, OID_MATTER_RCAC_ID};

/// 2023-01-01T00:00:00Z
const NOT_BEFORE_SECS: u64 = 1_672_531_200;
/// 2049-12-31T00:00:00Z, the last day UTCTime can express
const NOT_AFTER_SECS: u64 = 2_524_521_600;

/// A CA able to sign certificates.
pub struct CertIssuer {
    key: KeyPair,
    subject: Name,
    cert: Vec<u8>,
}

impl CertIssuer {
    /// Create a self-signed root CA.
    pub fn new_root(rcac_id: u64, fabric_id: Option<u64>) -> Result<Self, CryptoError> {
        let key = KeyPair::new();
        let subject = ca_name(OID_MATTER_RCAC_ID, rcac_id, fabric_id)?;
        let cert = sign_cert(&key, &subject, subject.clone(), &key.public_key())?;
        Ok(Self { key, subject, cert })
    }

    /// Create an intermediate CA signed by this one.
    pub fn issue_intermediate(
        &self,
        icac_id: u64,
        fabric_id: Option<u64>,
    ) -> Result<Self, CryptoError> {
        let key = KeyPair::new();
        let subject = ca_name(OID_MATTER_ICAC_ID, icac_id, fabric_id)?;
        let cert = sign_cert(&self.key, &self.subject, subject.clone(), &key.public_key())?;
        Ok(Self { key, subject, cert })
    }

    /// Issue a node operational certificate for `public_key`.
    pub fn issue_noc(
        &self,
        public_key: &[u8],
        node_id: u64,
        fabric_id: u64,
    ) -> Result<Vec<u8>, CryptoError> {
        let subject = RdnSequence(vec![
            rdn(OID_MATTER_NODE_ID, node_id)?,
            rdn(OID_MATTER_FABRIC_ID, fabric_id)?,
        ]);
        sign_cert(&self.key, &self.subject, subject, public_key)
    }

    /// DER encoding of this CA's own certificate.
    pub fn cert(&self) -> &[u8] {
        &self.cert
    }

    pub fn public_key(&self) -> [u8; EC_POINT_LEN_BYTES] {
        self.key.public_key()
    }
}

/// The public key a CSR asks to be certified.
pub fn csr_public_key(csr: &[u8]) -> Result<[u8; EC_POINT_LEN_BYTES], CryptoError> {
    let csr = CertReq::from_der(csr)?;
    csr.info
        .public_key
        .subject_public_key
        .raw_bytes()
        .try_into()
        .map_err(|_| CryptoError::InvalidKey)
}

fn rdn(oid: AttributeType, value: u64) -> Result<RelativeDistinguishedName, CryptoError> {
    let value = format!("{value:016X}");
    let atv = AttributeTypeAndValue {
        oid,
        value: Any::new(Tag::Utf8String, value.as_bytes())?,
    };
    Ok(RelativeDistinguishedName(vec![atv].try_into()?))
}

fn ca_name(oid: AttributeType, id: u64, fabric_id: Option<u64>) -> Result<Name, CryptoError> {
    let mut rdns = vec![rdn(oid, id)?];
    if let Some(fabric_id) = fabric_id {
        rdns.push(rdn(OID_MATTER_FABRIC_ID, fabric_id)?);
    }
    Ok(RdnSequence(rdns))
}

fn sign_cert(
    issuer_key: &KeyPair,
    issuer: &Name,
    subject: Name,
    public_key: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    // Single byte, positive serial
    let mut serial = [0u8; 1];
    fill_random(&mut serial);
    serial[0] = (serial[0] & 0x7F) | 0x01;

    let algorithm = AlgorithmIdentifier {
        oid: OID_ECDSA_WITH_SHA256,
        parameters: None,
    };
    let tbs_certificate = TbsCertificate {
        version: Version::V3,
        serial_number: SerialNumber::new(&serial)?,
        signature: algorithm.clone(),
        issuer: issuer.clone(),
        validity: Validity {
            not_before: Time::UtcTime(UtcTime::from_unix_duration(Duration::from_secs(
                NOT_BEFORE_SECS,
            ))?),
            not_after: Time::UtcTime(UtcTime::from_unix_duration(Duration::from_secs(
                NOT_AFTER_SECS,
            ))?),
        },
        subject,
        subject_public_key_info: spki_for(public_key)?,
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: None,
    };
    let signature = issuer_key.sign_msg_der(&tbs_certificate.to_der()?)?;
    let cert = Certificate {
        tbs_certificate,
        signature_algorithm: algorithm,
        signature: BitString::from_bytes(&signature)?,
    };
    Ok(cert.to_der()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::{Cert, CertKind};
    use crate::constants::MAX_CERT_LEN;

    #[test]
    fn test_issued_certs_fit_the_command_limits() {
        let root = CertIssuer::new_root(1, Some(0xFAB1)).unwrap();
        let ica = root.issue_intermediate(2, Some(0xFAB1)).unwrap();
        let noc = ica
            .issue_noc(&KeyPair::new().public_key(), 0xDEDE_DEDE_0000_0001, 0xFAB1)
            .unwrap();

        assert!(root.cert().len() <= MAX_CERT_LEN);
        assert!(ica.cert().len() <= MAX_CERT_LEN);
        assert!(noc.len() <= MAX_CERT_LEN);
        assert_eq!(Cert::new(ica.cert()).unwrap().kind(), CertKind::Intermediate);
        assert_eq!(
            Cert::new(&noc).unwrap().node_id(),
            Some(0xDEDE_DEDE_0000_0001)
        );
    }
}
