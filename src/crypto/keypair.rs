use elliptic_curve::sec1::ToEncodedPoint;
use p256::{
    ecdsa::{Signature, SigningKey, VerifyingKey},
    AffinePoint, PublicKey, SecretKey,
};
use x509_cert::{
    attr::AttributeType,
    der::{asn1::BitString, Any, Encode},
    name::RdnSequence,
    request::CertReq,
    spki::{AlgorithmIdentifier, SubjectPublicKeyInfoOwned},
};

use crate::constants::*;

use super::CryptoError;

/// ecPublicKey(1) http://www.oid-info.com/get/1.2.840.10045.2.1
pub(crate) const OID_EC_PUBLIC_KEY: AttributeType = AttributeType::new_unwrap("1.2.840.10045.2.1");
/// prime256v1 http://www.oid-info.com/get/1.2.840.10045.3.1.7
pub(crate) const OID_PRIME256V1: AttributeType = AttributeType::new_unwrap("1.2.840.10045.3.1.7");
/// ecdsa-with-SHA256(2) http://www.oid-info.com/get/1.2.840.10045.4.3.2
pub(crate) const OID_ECDSA_WITH_SHA256: AttributeType =
    AttributeType::new_unwrap("1.2.840.10045.4.3.2");
/// Organization name: http://www.oid-info.com/get/2.5.4.10
const OID_ORGANIZATION_NAME: AttributeType = AttributeType::new_unwrap("2.5.4.10");

#[derive(Clone)]
enum KeyType {
    Private(SecretKey),
    Public(PublicKey),
}

/// A P-256 key, either a full keypair or a peer's public key.
#[derive(Clone)]
pub struct KeyPair {
    key: KeyType,
}

impl core::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Never print the secret
        f.debug_struct("KeyPair")
            .field("public_key", &hex::encode(self.public_key()))
            .finish()
    }
}

impl KeyPair {
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();
        let secret_key = SecretKey::random(&mut rng);

        Self {
            key: KeyType::Private(secret_key),
        }
    }

    pub fn new_from_components(pub_key: &[u8], priv_key: &[u8]) -> Result<Self, CryptoError> {
        let secret_key = SecretKey::from_slice(priv_key).map_err(|_| CryptoError::InvalidKey)?;
        let public_key =
            PublicKey::from_sec1_bytes(pub_key).map_err(|_| CryptoError::InvalidKey)?;
        if public_key != secret_key.public_key() {
            return Err(CryptoError::InvalidKey);
        }

        Ok(Self {
            key: KeyType::Private(secret_key),
        })
    }

    pub fn new_from_public(pub_key: &[u8]) -> Result<Self, CryptoError> {
        let public_key =
            PublicKey::from_sec1_bytes(pub_key).map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self {
            key: KeyType::Public(public_key),
        })
    }

    fn public_key_point(&self) -> AffinePoint {
        match &self.key {
            KeyType::Private(k) => *(k.public_key().as_affine()),
            KeyType::Public(k) => *(k.as_affine()),
        }
    }

    fn private_key(&self) -> Result<&SecretKey, CryptoError> {
        match &self.key {
            KeyType::Private(key) => Ok(key),
            KeyType::Public(_) => Err(CryptoError::InvalidKey),
        }
    }

    /// The uncompressed SEC1 encoding of the public key.
    pub fn public_key(&self) -> [u8; EC_POINT_LEN_BYTES] {
        let point = self.public_key_point().to_encoded_point(false);
        let mut out = [0u8; EC_POINT_LEN_BYTES];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// The raw private scalar, for provisioning stores.
    pub fn private_key_bytes(&self) -> Result<[u8; EC_PRIVATE_KEY_LEN_BYTES], CryptoError> {
        let mut out = [0u8; EC_PRIVATE_KEY_LEN_BYTES];
        out.copy_from_slice(&self.private_key()?.to_bytes());
        Ok(out)
    }

    /// Build a PKCS#10 CSR for this key, DER encoded into `out_csr`.
    pub fn get_csr<'a>(&self, out_csr: &'a mut [u8]) -> Result<&'a [u8], CryptoError> {
        use p256::ecdsa::signature::Signer;

        let subject = RdnSequence(vec![x509_cert::name::RelativeDistinguishedName(
            vec![x509_cert::attr::AttributeTypeAndValue {
                oid: OID_ORGANIZATION_NAME,
                value: Any::new(x509_cert::der::Tag::Utf8String, "CSR".as_bytes())?,
            }]
            .try_into()?,
        )]);
        let info = x509_cert::request::CertReqInfo {
            version: x509_cert::request::Version::V1,
            subject,
            public_key: spki_for(&self.public_key())?,
            attributes: Default::default(),
        };
        let message = info.to_der()?;

        // Can't use self.sign_msg as the signature has to be in DER format
        let signing_key = SigningKey::from(self.private_key()?);
        let sig: Signature = signing_key.sign(&message);
        let to_der = sig.to_der();

        let csr = CertReq {
            info,
            algorithm: AlgorithmIdentifier {
                oid: OID_ECDSA_WITH_SHA256,
                parameters: None,
            },
            signature: BitString::from_bytes(to_der.as_bytes())?,
        };
        let out = csr.to_der()?;
        if out.len() > out_csr.len() {
            return Err(CryptoError::BufferTooSmall);
        }
        let a = &mut out_csr[0..out.len()];
        a.copy_from_slice(&out);

        Ok(a)
    }

    /// Sign `msg` with ECDSA-SHA256, returning the raw `r || s` signature.
    pub fn sign_msg(&self, msg: &[u8]) -> Result<[u8; EC_SIGNATURE_LEN_BYTES], CryptoError> {
        use p256::ecdsa::signature::Signer;

        let signing_key = SigningKey::from(self.private_key()?);
        let sig: Signature = signing_key.sign(msg);
        let mut out = [0u8; EC_SIGNATURE_LEN_BYTES];
        out.copy_from_slice(&sig.to_bytes());
        Ok(out)
    }

    /// Same as [`KeyPair::sign_msg`] but DER encoded, as X.509 expects.
    pub fn sign_msg_der(&self, msg: &[u8]) -> Result<Vec<u8>, CryptoError> {
        use p256::ecdsa::signature::Signer;

        let signing_key = SigningKey::from(self.private_key()?);
        let sig: Signature = signing_key.sign(msg);
        Ok(sig.to_der().as_bytes().to_vec())
    }

    pub fn verify_msg(&self, msg: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        use p256::ecdsa::signature::Verifier;

        let verifying_key = VerifyingKey::from_affine(self.public_key_point())
            .map_err(|_| CryptoError::InvalidKey)?;
        let signature =
            Signature::from_slice(signature).map_err(|_| CryptoError::InvalidSignature)?;

        verifying_key
            .verify(msg, &signature)
            .map_err(|_| CryptoError::InvalidSignature)
    }
}

impl Default for KeyPair {
    fn default() -> Self {
        Self::new()
    }
}

/// SubjectPublicKeyInfo of an uncompressed P-256 point.
pub(crate) fn spki_for(public_key: &[u8]) -> Result<SubjectPublicKeyInfoOwned, CryptoError> {
    Ok(SubjectPublicKeyInfoOwned {
        algorithm: AlgorithmIdentifier {
            oid: OID_EC_PUBLIC_KEY,
            parameters: Some(Any::new(
                x509_cert::der::Tag::ObjectIdentifier,
                OID_PRIME256V1.as_bytes(),
            )?),
        },
        subject_public_key: BitString::from_bytes(public_key)?,
    })
}

#[cfg(test)]
mod tests {
    use x509_cert::der::Decode;

    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let keypair = KeyPair::new();
        let signature = keypair.sign_msg(b"fabric").unwrap();
        keypair.verify_msg(b"fabric", &signature).unwrap();

        let peer = KeyPair::new_from_public(&keypair.public_key()).unwrap();
        assert_eq!(
            peer.verify_msg(b"other", &signature),
            Err(CryptoError::InvalidSignature)
        );
        assert_eq!(peer.sign_msg(b"fabric"), Err(CryptoError::InvalidKey));
    }

    #[test]
    fn test_csr_carries_public_key() {
        let keypair = KeyPair::new();
        let mut buf = [0u8; MAX_CSR_LEN];
        let csr = keypair.get_csr(&mut buf).unwrap();
        let parsed = CertReq::from_der(csr).unwrap();
        assert_eq!(
            parsed.info.public_key.subject_public_key.raw_bytes(),
            keypair.public_key()
        );
    }

    #[test]
    fn test_csr_buffer_too_small() {
        let keypair = KeyPair::new();
        let mut buf = [0u8; 16];
        assert!(matches!(
            keypair.get_csr(&mut buf),
            Err(CryptoError::BufferTooSmall)
        ));
    }
}
