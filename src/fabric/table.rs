use tracing::{debug, info, warn};

use crate::{
    cert::{self, Cert, CertError},
    constants::{MAX_CSR_LEN, MAX_FABRIC_LABEL_LEN},
    crypto::{self, CryptoError, KeyPair},
};

use super::{
    is_operational_node_id, FabricEvent, FabricIndex, FabricInfo, FabricListener,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FabricError {
    #[error("fabric not found")]
    NotFound,
    #[error("no free fabric slot")]
    TableFull,
    #[error("NOC public key does not match the pending operational key")]
    InvalidPublicKey,
    #[error("NOC node id is not an operational node id")]
    WrongNodeId,
    #[error("a fabric with the same root and fabric id already exists")]
    FabricExists,
    #[error("operation not allowed in the current pending state")]
    IncorrectState,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("out of storage for pending state")]
    NoMemory,
    #[error("invalid fabric index")]
    InvalidFabricIndex,
    #[error(transparent)]
    Cert(#[from] CertError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Purpose of the operational key generated by the last CSRRequest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingKey {
    None,
    ForAdd,
    ForUpdate(FabricIndex),
}

struct PendingOperationalKey {
    key: KeyPair,
    /// The index the key will be installed under.
    fabric_index: FabricIndex,
    for_update: bool,
}

enum PendingFabric {
    Added(FabricInfo),
    Updated(FabricInfo),
}

impl PendingFabric {
    fn info(&self) -> &FabricInfo {
        match self {
            PendingFabric::Added(info) | PendingFabric::Updated(info) => info,
        }
    }

    fn info_mut(&mut self) -> &mut FabricInfo {
        match self {
            PendingFabric::Added(info) | PendingFabric::Updated(info) => info,
        }
    }
}

/// Committed fabrics, plus at most one set of pending credentials staged
/// during a fail-safe.
///
/// Readers see the pending state overlaid on the committed one: a pending
/// update replaces its fabric, a pending addition is appended.
pub struct FabricTable<'a> {
    fabrics: Vec<FabricInfo>,
    capacity: usize,
    /// Where the search for a free index starts.
    next_index: FabricIndex,
    pending_root: Option<Cert>,
    pending_key: Option<PendingOperationalKey>,
    pending_fabric: Option<PendingFabric>,
    listeners: Vec<&'a dyn FabricListener>,
}

impl<'a> FabricTable<'a> {
    pub fn new(capacity: u8) -> Self {
        Self {
            fabrics: Vec::with_capacity(capacity as usize),
            capacity: (capacity as usize).min(FabricIndex::MAX as usize),
            next_index: FabricIndex::MIN,
            pending_root: None,
            pending_key: None,
            pending_fabric: None,
            listeners: Vec::new(),
        }
    }

    pub fn add_listener(&mut self, listener: &'a dyn FabricListener) {
        self.listeners.push(listener);
    }

    fn notify(&self, event: FabricEvent) {
        debug!(?event, "Fabric table changed");
        for listener in self.listeners.iter() {
            listener.on_fabric_event(self, &event);
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// All fabrics, pending data taking precedence over committed data.
    pub fn iter(&self) -> impl Iterator<Item = &FabricInfo> + '_ {
        let (updated, added) = match &self.pending_fabric {
            Some(PendingFabric::Updated(info)) => (Some(info), None),
            Some(PendingFabric::Added(info)) => (None, Some(info)),
            None => (None, None),
        };
        self.fabrics
            .iter()
            .map(move |fabric| match updated {
                Some(update) if update.index == fabric.index => update,
                _ => fabric,
            })
            .chain(added)
    }

    pub fn find(&self, index: FabricIndex) -> Option<&FabricInfo> {
        self.iter().find(|fabric| fabric.index == index)
    }

    /// Number of fabrics, a fabric pending addition included.
    pub fn fabric_count(&self) -> usize {
        self.iter().count()
    }

    pub fn pending_operational_key(&self) -> PendingKey {
        match &self.pending_key {
            None => PendingKey::None,
            Some(pending) if pending.for_update => PendingKey::ForUpdate(pending.fabric_index),
            Some(_) => PendingKey::ForAdd,
        }
    }

    pub fn has_pending_root_cert(&self) -> bool {
        self.pending_root.is_some()
    }

    /// Whether a NOC is staged, for addition or update.
    pub fn has_pending_fabric(&self) -> bool {
        self.pending_fabric.is_some()
    }

    fn is_index_in_use(&self, index: FabricIndex) -> bool {
        self.iter().any(|fabric| fabric.index == index)
    }

    fn next_available_index(&self) -> Option<FabricIndex> {
        if self.fabric_count() >= self.capacity {
            return None;
        }
        let mut index = self.next_index;
        for _ in 0..FabricIndex::MAX {
            if !self.is_index_in_use(index) {
                return Some(index);
            }
            index = index.next_wrapping();
        }
        None
    }

    /// Trusted root certificates of all fabrics, without duplicates.
    pub fn trusted_root_certs(&self) -> Vec<&[u8]> {
        let mut roots: Vec<&[u8]> = Vec::with_capacity(self.capacity);
        for fabric in self.iter() {
            if !roots.contains(&fabric.root_cert()) {
                roots.push(fabric.root_cert());
            }
        }
        roots
    }

    /// Whether a fabric other than `index` already uses `label`.
    pub fn label_in_use_by_other(&self, index: Option<FabricIndex>, label: &str) -> bool {
        self.iter()
            .any(|fabric| Some(fabric.index) != index && fabric.label.as_bytes() == label.as_bytes())
    }

    /// Stage a root certificate for the fabric about to be added.
    pub fn add_new_pending_trusted_root_cert(&mut self, der: &[u8]) -> Result<(), FabricError> {
        if self.pending_root.is_some() || self.pending_fabric.is_some() {
            return Err(FabricError::IncorrectState);
        }
        // Roots only come with new fabrics
        if matches!(self.pending_operational_key(), PendingKey::ForUpdate(_)) {
            return Err(FabricError::IncorrectState);
        }
        if self.next_available_index().is_none() {
            return Err(FabricError::NoMemory);
        }
        let root = cert::validate_rcac(der)?;
        info!(%root, "Pending trusted root");
        self.pending_root = Some(root);
        Ok(())
    }

    /// Generate a fresh operational key and return a DER CSR for it.
    ///
    /// `fabric` selects an update of that fabric, `None` a new fabric.
    /// A key generated by an earlier call is discarded.
    pub fn allocate_pending_operational_key(
        &mut self,
        fabric: Option<FabricIndex>,
    ) -> Result<Vec<u8>, FabricError> {
        if self.pending_fabric.is_some() {
            return Err(FabricError::IncorrectState);
        }
        let (fabric_index, for_update) = match fabric {
            Some(index) => {
                // An update cannot change the root
                if self.pending_root.is_some() {
                    return Err(FabricError::IncorrectState);
                }
                if self.find(index).is_none() {
                    return Err(FabricError::InvalidFabricIndex);
                }
                (index, true)
            }
            None => (self.next_available_index().ok_or(FabricError::NoMemory)?, false),
        };

        let key = KeyPair::new();
        let mut buf = [0u8; MAX_CSR_LEN];
        let csr = key.get_csr(&mut buf)?.to_vec();
        debug!(%fabric_index, for_update, "Allocated pending operational key");
        self.pending_key = Some(PendingOperationalKey {
            key,
            fabric_index,
            for_update,
        });
        Ok(csr)
    }

    fn validate_noc(
        &self,
        noc: &[u8],
        icac: Option<&[u8]>,
        rcac: &Cert,
        pending_key: &KeyPair,
    ) -> Result<Cert, FabricError> {
        let noc = Cert::new(noc)?;
        let icac = icac.map(Cert::new).transpose()?;
        cert::validate_chain(&noc, icac.as_ref(), rcac)?;
        if noc.public_key() != &pending_key.public_key() {
            return Err(FabricError::InvalidPublicKey);
        }
        match noc.node_id() {
            Some(node_id) if is_operational_node_id(node_id) => Ok(noc),
            _ => Err(FabricError::WrongNodeId),
        }
    }

    /// Stage a new fabric from the pending root, the pending operational key
    /// and `noc`/`icac`. The fabric is visible but not committed.
    pub fn add_new_pending_fabric_with_operational_keystore(
        &mut self,
        noc: &[u8],
        icac: Option<&[u8]>,
        vendor_id: u16,
    ) -> Result<FabricIndex, FabricError> {
        if self.pending_fabric.is_some() {
            return Err(FabricError::IncorrectState);
        }
        let rcac = self.pending_root.as_ref().ok_or(FabricError::IncorrectState)?;
        let pending = match &self.pending_key {
            Some(pending) if !pending.for_update => pending,
            _ => return Err(FabricError::IncorrectState),
        };

        let noc_cert = self.validate_noc(noc, icac, rcac, &pending.key)?;
        let fabric_id = noc_cert.fabric_id().ok_or(CertError::MissingFabricId)?;
        let root_public_key = *rcac.public_key();
        if self
            .fabrics
            .iter()
            .any(|f| f.fabric_id == fabric_id && f.root_public_key == root_public_key)
        {
            warn!("Fabric {fabric_id:016X} already commissioned");
            return Err(FabricError::FabricExists);
        }
        let index = if self.is_index_in_use(pending.fabric_index) {
            self.next_available_index().ok_or(FabricError::TableFull)?
        } else if self.fabric_count() >= self.capacity {
            return Err(FabricError::TableFull);
        } else {
            pending.fabric_index
        };
        let compressed_fabric_id = crypto::compressed_fabric_id(&root_public_key, fabric_id)?;

        let root_cert = rcac.as_der().to_vec();
        let node_id = noc_cert.node_id().unwrap_or_default();
        let Some(pending) = self.pending_key.take() else {
            return Err(FabricError::IncorrectState);
        };
        let info = FabricInfo {
            index,
            root_cert,
            icac: icac.map(<[u8]>::to_vec),
            noc: noc.to_vec(),
            node_id,
            fabric_id,
            compressed_fabric_id,
            root_public_key,
            vendor_id,
            label: heapless::String::new(),
            operational_key: pending.key,
        };
        info!(%index, %noc_cert, "Pending fabric added");
        self.pending_fabric = Some(PendingFabric::Added(info));
        self.next_index = index.next_wrapping();
        Ok(index)
    }

    /// Stage new operational credentials for an existing fabric.
    pub fn update_pending_fabric_with_operational_keystore(
        &mut self,
        index: FabricIndex,
        noc: &[u8],
        icac: Option<&[u8]>,
    ) -> Result<(), FabricError> {
        if self.pending_root.is_some() || self.pending_fabric.is_some() {
            return Err(FabricError::IncorrectState);
        }
        let pending = match &self.pending_key {
            Some(pending) if pending.for_update && pending.fabric_index == index => pending,
            _ => return Err(FabricError::IncorrectState),
        };
        let existing = self.find(index).ok_or(FabricError::InvalidFabricIndex)?;

        let rcac = Cert::new(existing.root_cert())?;
        let noc_cert = self.validate_noc(noc, icac, &rcac, &pending.key)?;
        if noc_cert.fabric_id() != Some(existing.fabric_id) {
            return Err(CertError::FabricIdMismatch.into());
        }

        let mut info = existing.clone();
        let Some(pending) = self.pending_key.take() else {
            return Err(FabricError::IncorrectState);
        };
        info.noc = noc.to_vec();
        info.icac = icac.map(<[u8]>::to_vec);
        info.node_id = noc_cert.node_id().unwrap_or_default();
        info.operational_key = pending.key;
        info!(%index, %noc_cert, "Pending fabric update");
        self.pending_fabric = Some(PendingFabric::Updated(info));
        self.notify(FabricEvent::Updated(index));
        Ok(())
    }

    /// Make the pending fabric permanent.
    ///
    /// Committing with only a root, or only a key, pending is an error and
    /// reverts the pending state.
    pub fn commit_pending_fabric_data(&mut self) -> Result<(), FabricError> {
        let Some(pending) = self.pending_fabric.take() else {
            if self.pending_root.is_some() || self.pending_key.is_some() {
                warn!("Commit without a pending NOC, reverting");
                self.revert_pending_fabric_data();
                return Err(FabricError::IncorrectState);
            }
            return Ok(());
        };
        self.pending_root = None;
        self.pending_key = None;

        let index = pending.info().index;
        match pending {
            PendingFabric::Added(info) => {
                let position = self.fabrics.partition_point(|f| f.index < info.index);
                self.fabrics.insert(position, info);
            }
            PendingFabric::Updated(info) => {
                if let Some(fabric) = self.fabrics.iter_mut().find(|f| f.index == info.index) {
                    *fabric = info;
                }
            }
        }
        info!(%index, "Fabric committed");
        self.notify(FabricEvent::Committed(index));
        Ok(())
    }

    /// Drop all pending state, the pending root included.
    pub fn revert_pending_fabric_data(&mut self) {
        self.pending_root = None;
        self.revert_pending_op_certs_except_root();
    }

    /// Drop the pending NOC, ICAC and operational key, keeping a pending root.
    pub fn revert_pending_op_certs_except_root(&mut self) {
        self.pending_key = None;
        match self.pending_fabric.take() {
            Some(PendingFabric::Updated(info)) => {
                debug!(index = %info.index, "Reverted pending update");
                self.notify(FabricEvent::Updated(info.index));
            }
            Some(PendingFabric::Added(info)) => {
                debug!(index = %info.index, "Dropped pending fabric");
            }
            None => {}
        }
    }

    /// Remove a fabric, committed or pending addition, right away.
    pub fn delete(&mut self, index: FabricIndex) -> Result<(), FabricError> {
        let is_pending = matches!(
            &self.pending_fabric,
            Some(pending) if pending.info().index == index
        );
        if !is_pending && !self.fabrics.iter().any(|f| f.index == index) {
            return Err(FabricError::NotFound);
        }

        self.notify(FabricEvent::WillBeRemoved(index));
        if is_pending {
            self.pending_fabric = None;
            self.pending_key = None;
            self.pending_root = None;
        }
        self.fabrics.retain(|f| f.index != index);
        info!(%index, "Fabric deleted");
        self.notify(FabricEvent::Removed(index));
        Ok(())
    }

    pub fn set_fabric_label(&mut self, index: FabricIndex, label: &str) -> Result<(), FabricError> {
        if label.len() > MAX_FABRIC_LABEL_LEN {
            return Err(FabricError::InvalidArgument);
        }
        let mut value = heapless::String::new();
        value
            .push_str(label)
            .map_err(|_| FabricError::InvalidArgument)?;
        let fabric = match &mut self.pending_fabric {
            Some(pending) if pending.info().index == index => pending.info_mut(),
            _ => self
                .fabrics
                .iter_mut()
                .find(|f| f.index == index)
                .ok_or(FabricError::NotFound)?,
        };
        fabric.label = value;
        self.notify(FabricEvent::Updated(index));
        Ok(())
    }
}
