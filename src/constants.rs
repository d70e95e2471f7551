//! All the constants used by the operational credentials server.
//! Some limits are configurable at runtime through [`crate::config::DeviceConfig`],
//! the values here are the protocol-defined ones.

pub const EC_SIGNATURE_LEN_BYTES: usize = 64;
/// Uncompressed SEC1 P-256 point, including the 0x04 prefix.
pub const EC_POINT_LEN_BYTES: usize = 65;
pub const EC_PRIVATE_KEY_LEN_BYTES: usize = 32;

pub const CRYPTO_SYMMETRIC_KEY_LENGTH_BITS: usize = 128;
pub const CRYPTO_SYMMETRIC_KEY_LENGTH_BYTES: usize = CRYPTO_SYMMETRIC_KEY_LENGTH_BITS / 8;

/// Largest certificate accepted by any of the credential commands.
pub const MAX_CERT_LEN: usize = 400;
/// Largest CSR the operational keystore will produce.
pub const MAX_CSR_LEN: usize = 300;
pub const MAX_CERT_DECLARATION_LEN: usize = 600;
/// Response payloads are bounded to this size (11.18.4).
pub const RESP_MAX: usize = 900;

/// Size of the CSRNonce and AttestationNonce fields.
pub const EXPECTED_NONCE_LEN_BYTES: usize = 32;
pub const ATTESTATION_CHALLENGE_LEN_BYTES: usize = CRYPTO_SYMMETRIC_KEY_LENGTH_BYTES;
pub const IPK_LEN_BYTES: usize = CRYPTO_SYMMETRIC_KEY_LENGTH_BYTES;
/// The IPK is always installed as group key set 0.
pub const IPK_KEY_SET_ID: u16 = 0;

/// 2000-01-01T00:00:00Z, the start of Matter epoch time.
pub const MATTER_EPOCH_SECS: u64 = 946_684_800;

pub const MAX_FABRIC_LABEL_LEN: usize = 32;
pub const MAX_DEBUG_TEXT_LEN: usize = 128;

pub const COMPRESSED_FABRIC_ID_INFO: [u8; 16] = *b"CompressedFabric";
pub const COMPRESSED_FABRIC_ID_LEN_BYTES: usize = 8;
pub const GROUP_KEY_INFO: [u8; 13] = *b"GroupKey v1.0";

pub const VENDOR_ID_COMMON: u16 = 0x0000;
/// Test vendor ids 0xFFF1..=0xFFF4 are still operationally valid.
pub const VENDOR_ID_MAX_OPERATIONAL: u16 = 0xFFF4;

pub const MIN_OPERATIONAL_NODE_ID: u64 = 0x0000_0000_0000_0001;
pub const MAX_OPERATIONAL_NODE_ID: u64 = 0xFFFF_FFEF_FFFF_FFFF;
pub const MIN_CASE_AUTH_TAG_NODE_ID: u64 = 0xFFFF_FFFD_0000_0000;
pub const MAX_CASE_AUTH_TAG_NODE_ID: u64 = 0xFFFF_FFFD_FFFF_FFFF;

/// Default number of fabrics a node supports (SupportedFabrics).
pub const DEFAULT_SUPPORTED_FABRICS: u8 = 5;
pub const DEFAULT_ACL_ENTRIES_PER_FABRIC: usize = 4;
pub const DEFAULT_KEY_SETS_PER_FABRIC: usize = 3;
pub const DEFAULT_FAIL_SAFE_EXPIRY_SECS: u16 = 60;
pub const DEFAULT_MAX_CUMULATIVE_FAIL_SAFE_SECS: u16 = 900;

/// Dirty attribute paths buffered before the reporting engine drains them.
pub const REPORTING_QUEUE_DEPTH: usize = 32;
