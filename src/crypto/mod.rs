use rand::RngCore;
use sha2::Sha256;

use crate::constants::{
    COMPRESSED_FABRIC_ID_INFO, COMPRESSED_FABRIC_ID_LEN_BYTES, CRYPTO_SYMMETRIC_KEY_LENGTH_BYTES,
    EC_POINT_LEN_BYTES, GROUP_KEY_INFO,
};

pub mod keypair;

pub use keypair::KeyPair;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid key material")]
    InvalidKey,
    #[error("signature verification failed")]
    InvalidSignature,
    #[error("output length not supported by the KDF")]
    InvalidLength,
    #[error("buffer too small")]
    BufferTooSmall,
    #[error("DER encoding failed: {0}")]
    Der(x509_cert::der::Error),
}

impl From<x509_cert::der::Error> for CryptoError {
    fn from(value: x509_cert::der::Error) -> Self {
        Self::Der(value)
    }
}

// Random bytes generator
pub fn fill_random(out: &mut [u8]) {
    rand::thread_rng().fill_bytes(out);
}

pub fn hkdf_sha256(salt: &[u8], ikm: &[u8], info: &[u8], key: &mut [u8]) -> Result<(), CryptoError> {
    hkdf::Hkdf::<Sha256>::new(Some(salt), ikm)
        .expand(info, key)
        .map_err(|_| CryptoError::InvalidLength)
}

/// Compressed Fabric Identifier (4.3.2.2)
///
/// `root_public_key` is the uncompressed SEC1 point of the fabric's root CA.
pub fn compressed_fabric_id(root_public_key: &[u8], fabric_id: u64) -> Result<u64, CryptoError> {
    if root_public_key.len() != EC_POINT_LEN_BYTES {
        return Err(CryptoError::InvalidKey);
    }
    let mut out = [0u8; COMPRESSED_FABRIC_ID_LEN_BYTES];
    // The 0x04 uncompressed point marker is not part of the key material
    hkdf_sha256(
        &fabric_id.to_be_bytes(),
        &root_public_key[1..],
        &COMPRESSED_FABRIC_ID_INFO,
        &mut out,
    )?;
    Ok(u64::from_be_bytes(out))
}

/// Operational group key derived from an epoch key (4.15.2.6)
pub fn derive_group_operational_key(
    epoch_key: &[u8],
    compressed_fabric_id: u64,
) -> Result<[u8; CRYPTO_SYMMETRIC_KEY_LENGTH_BYTES], CryptoError> {
    let mut out = [0u8; CRYPTO_SYMMETRIC_KEY_LENGTH_BYTES];
    hkdf_sha256(
        &compressed_fabric_id.to_be_bytes(),
        epoch_key,
        &GROUP_KEY_INFO,
        &mut out,
    )?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn test_compressed_fabric_id() {
        let root_public_key = hex!(
            "04"
            "4a9f42b1ca4840d37292bbc7f6a7e11e22200c976fc900dbc98a7a383a641cb8"
            "254a2e56d4e295a847943b4e3897c4a773e930277b4d9fbede8a052686bfacfa"
        );
        let id = compressed_fabric_id(&root_public_key, 0x2906_C908_D115_D362).unwrap();
        assert_eq!(id, 0x87E1_B004_E235_A130);
    }

    #[test]
    fn test_compressed_fabric_id_rejects_short_key() {
        assert_eq!(
            compressed_fabric_id(&[0x04; 33], 1),
            Err(CryptoError::InvalidKey)
        );
    }

    #[test]
    fn test_group_key_depends_on_fabric() {
        let epoch_key = [0x5a; 16];
        let a = derive_group_operational_key(&epoch_key, 1).unwrap();
        let b = derive_group_operational_key(&epoch_key, 2).unwrap();
        assert_ne!(a, b);
    }
}
