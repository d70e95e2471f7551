//! Device attestation credentials (6.2)

use crate::{
    constants::{EC_POINT_LEN_BYTES, EC_PRIVATE_KEY_LEN_BYTES, EC_SIGNATURE_LEN_BYTES},
    crypto::{CryptoError, KeyPair},
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DevAttError {
    #[error("{0:?} is not provisioned")]
    NotProvisioned(DataType),
    #[error("buffer too small for {0:?}")]
    BufferTooSmall(DataType),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Device Attestation Data Type
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DataType {
    /// Certificate Declaration
    CertDeclaration,
    /// Product Attestation Intermediate Certificate
    Pai,
    /// Device Attestation Certificate
    Dac,
    /// Device Attestation Certificate - Public Key
    DacPubKey,
    /// Device Attestation Certificate - Private Key
    DacPrivKey,
}

/// Access to the attestation data programmed into the device.
pub trait DevAttDataFetcher {
    /// Copy the data into `buf`, returning the written part.
    fn get_devatt_data<'a>(
        &self,
        data_type: DataType,
        buf: &'a mut [u8],
    ) -> Result<&'a [u8], DevAttError>;
}

impl<T> DevAttDataFetcher for &T
where
    T: DevAttDataFetcher,
{
    fn get_devatt_data<'a>(
        &self,
        data_type: DataType,
        buf: &'a mut [u8],
    ) -> Result<&'a [u8], DevAttError> {
        (**self).get_devatt_data(data_type, buf)
    }
}

/// Sign `message` with the DAC private key.
pub fn sign_with_dac(
    dev_att: &dyn DevAttDataFetcher,
    message: &[u8],
) -> Result<[u8; EC_SIGNATURE_LEN_BYTES], DevAttError> {
    let mut public_key = [0u8; EC_POINT_LEN_BYTES];
    let mut private_key = [0u8; EC_PRIVATE_KEY_LEN_BYTES];
    let public_key = dev_att.get_devatt_data(DataType::DacPubKey, &mut public_key)?;
    let private_key = dev_att.get_devatt_data(DataType::DacPrivKey, &mut private_key)?;
    let dac_key = KeyPair::new_from_components(public_key, private_key)?;
    Ok(dac_key.sign_msg(message)?)
}

/// Attestation data held in memory, for devices that load it at startup.
pub struct DevAttCredentials {
    cert_declaration: Vec<u8>,
    pai: Vec<u8>,
    dac: Vec<u8>,
    dac_public_key: [u8; EC_POINT_LEN_BYTES],
    dac_private_key: [u8; EC_PRIVATE_KEY_LEN_BYTES],
}

impl DevAttCredentials {
    pub fn new(
        cert_declaration: &[u8],
        pai: &[u8],
        dac: &[u8],
        dac_public_key: &[u8],
        dac_private_key: &[u8],
    ) -> Result<Self, DevAttError> {
        // Rejects mismatched halves
        KeyPair::new_from_components(dac_public_key, dac_private_key)?;
        let mut public_key = [0u8; EC_POINT_LEN_BYTES];
        public_key.copy_from_slice(dac_public_key);
        let mut private_key = [0u8; EC_PRIVATE_KEY_LEN_BYTES];
        private_key.copy_from_slice(dac_private_key);
        Ok(Self {
            cert_declaration: cert_declaration.to_vec(),
            pai: pai.to_vec(),
            dac: dac.to_vec(),
            dac_public_key: public_key,
            dac_private_key: private_key,
        })
    }
}

impl DevAttDataFetcher for DevAttCredentials {
    fn get_devatt_data<'a>(
        &self,
        data_type: DataType,
        buf: &'a mut [u8],
    ) -> Result<&'a [u8], DevAttError> {
        let data: &[u8] = match data_type {
            DataType::CertDeclaration => &self.cert_declaration,
            DataType::Pai => &self.pai,
            DataType::Dac => &self.dac,
            DataType::DacPubKey => &self.dac_public_key,
            DataType::DacPrivKey => &self.dac_private_key,
        };
        if data.is_empty() {
            return Err(DevAttError::NotProvisioned(data_type));
        }
        let out = buf
            .get_mut(..data.len())
            .ok_or(DevAttError::BufferTooSmall(data_type))?;
        out.copy_from_slice(data);
        Ok(out)
    }
}
