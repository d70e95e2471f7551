use std::cell::RefCell;

use libmdns::{Responder, Service};
use tracing::info;

use super::{AdvertiseError, Advertiser, OperationalInstance, DNS_MATTER_PORT};

const OPERATIONAL_SERVICE: &str = "_matter._tcp";

/// Operational advertisement through a libmdns responder.
///
/// Dropping a [`Service`] withdraws its records, so a restart is simply
/// replacing the registered set.
pub struct MdnsAdvertiser {
    responder: Responder,
    port: u16,
    services: RefCell<Vec<Service>>,
}

impl MdnsAdvertiser {
    pub fn new() -> Result<Self, AdvertiseError> {
        Self::with_port(DNS_MATTER_PORT)
    }

    pub fn with_port(port: u16) -> Result<Self, AdvertiseError> {
        let responder =
            Responder::new().map_err(|e| AdvertiseError::Responder(e.to_string()))?;
        Ok(Self {
            responder,
            port,
            services: RefCell::new(Vec::new()),
        })
    }
}

impl Advertiser for MdnsAdvertiser {
    fn restart(&self, instances: &[OperationalInstance]) -> Result<(), AdvertiseError> {
        let mut services = self.services.borrow_mut();
        services.clear();
        for instance in instances {
            let name = instance.name();
            info!(name = name.as_str(), "Advertising operational instance");
            services.push(self.responder.register(
                OPERATIONAL_SERVICE.to_owned(),
                name.as_str().to_owned(),
                self.port,
                &[],
            ));
        }
        Ok(())
    }
}
