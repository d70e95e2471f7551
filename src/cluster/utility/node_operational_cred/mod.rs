//! Node Operational Credentials cluster (11.18)
//!
//! Sequences the commissioning of the node onto fabrics. A commissioner
//! stages a trusted root, asks for a CSR and then installs the resulting NOC
//! with AddNOC (or replaces one with UpdateNOC), all while a fail-safe is
//! armed. Nothing is committed here: General Commissioning commits on
//! CommissioningComplete, and fail-safe expiry undoes what was staged.

use core::cell::RefCell;

use num::FromPrimitive;
use tracing::{debug, error, info, warn};

use crate::{
    acl::{AccessControl, AclEntry, Privilege},
    cert,
    cluster::{
        Cluster, ClusterClassification, GlobalAttributes, ATTR_ATTRIBUTE_LIST,
        ATTR_CLUSTER_REVISION, ATTR_FEATURE_MAP,
    },
    config::DeviceConfig,
    constants::*,
    data_model::{Attribute, AttributeQuality},
    dev_att::{sign_with_dac, DataType, DevAttDataFetcher},
    exchange::Exchange,
    fabric::{
        is_valid_case_admin_subject, is_vendor_id_valid_operationally, FabricDescriptor,
        FabricError, FabricIndex, FabricInfo, FabricTable, PendingKey,
    },
    failsafe::FailSafeContext,
    group_keys::{GroupDataProvider, KeySet},
    interaction_model::{reporting::AttributeReporter, ImStatus, ReadContext},
    session_context::{SessionManager, SessionMode},
    tlv::{Encoder, TagControl, TagLengthValue},
    transport::{operational_instances, Advertiser},
    util::time::Epoch,
};

pub mod attributes;
pub mod commands;
pub mod notifier;
pub mod status;

pub use attributes::{write_fabric_descriptor, Attributes, NocStruct};
pub use commands::{
    AddNocRequest, AttestationResponse, CertificateChainResponse, CertificateChainType,
    Commands, CsrRequest, CsrResponse, NocCommand, NocCommandResponse, RespCommands,
    UpdateNocRequest,
};
pub use notifier::{FabricChangeNotifier, FabricStateCleanup};
pub use status::{im_status_for, noc_status_for, NocError, NocResponse, NocStatus};

use attributes::report_fabric_attributes;

pub const CLUSTER_ID: u16 = 0x003E;

pub const CLUSTER: Cluster<'static> = Cluster {
    id: CLUSTER_ID,
    classification: ClusterClassification::Utility,
    revision: 1,
    features: 0,
    attributes: &[
        ATTR_CLUSTER_REVISION,
        ATTR_FEATURE_MAP,
        ATTR_ATTRIBUTE_LIST,
        Attribute::new(
            Attributes::Nocs as _,
            AttributeQuality::LIST
                .union(AttributeQuality::FABRIC_SCOPED)
                .union(AttributeQuality::FABRIC_SENSITIVE),
            Privilege::Administer,
        ),
        Attribute::new(
            Attributes::Fabrics as _,
            AttributeQuality::LIST.union(AttributeQuality::FABRIC_SCOPED),
            Privilege::View,
        ),
        Attribute::new(
            Attributes::SupportedFabrics as _,
            AttributeQuality::FIXED,
            Privilege::View,
        ),
        Attribute::new(
            Attributes::CommissionedFabrics as _,
            AttributeQuality::empty(),
            Privilege::View,
        ),
        Attribute::new(
            Attributes::TrustedRootCertificates as _,
            AttributeQuality::LIST,
            Privilege::View,
        ),
        Attribute::new(
            Attributes::CurrentFabricIndex as _,
            AttributeQuality::empty(),
            Privilege::View,
        ),
    ],
    commands: &[
        Commands::AttestationRequest as _,
        Commands::CertificateChainRequest as _,
        Commands::CsrRequest as _,
        Commands::AddNoc as _,
        Commands::UpdateNoc as _,
        Commands::UpdateFabricLabel as _,
        Commands::RemoveFabric as _,
        Commands::AddTrustedRootCertificate as _,
    ],
    generated_commands: &[
        RespCommands::AttestationResponse as _,
        RespCommands::CertificateChainResponse as _,
        RespCommands::CsrResponse as _,
        RespCommands::NocResponse as _,
    ],
};

/// Server side of the cluster, on the root endpoint.
pub struct NocCluster<'a> {
    config: &'a DeviceConfig,
    fabrics: &'a RefCell<FabricTable<'a>>,
    failsafe: &'a RefCell<FailSafeContext>,
    groups: &'a RefCell<dyn GroupDataProvider>,
    acl: &'a RefCell<dyn AccessControl>,
    sessions: &'a RefCell<dyn SessionManager>,
    reporter: &'a dyn AttributeReporter,
    advertiser: &'a dyn Advertiser,
    dev_att: Option<&'a dyn DevAttDataFetcher>,
    epoch: Epoch,
}

/// What a partial AddNOC has changed so far.
#[derive(Debug, Default)]
struct StagedAddNoc {
    fabric: Option<FabricIndex>,
    session_adopted: bool,
}

impl<'a> NocCluster<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &'a DeviceConfig,
        fabrics: &'a RefCell<FabricTable<'a>>,
        failsafe: &'a RefCell<FailSafeContext>,
        groups: &'a RefCell<dyn GroupDataProvider>,
        acl: &'a RefCell<dyn AccessControl>,
        sessions: &'a RefCell<dyn SessionManager>,
        reporter: &'a dyn AttributeReporter,
        advertiser: &'a dyn Advertiser,
        dev_att: Option<&'a dyn DevAttDataFetcher>,
        epoch: Epoch,
    ) -> Self {
        Self {
            config,
            fabrics,
            failsafe,
            groups,
            acl,
            sessions,
            reporter,
            advertiser,
            dev_att,
            epoch,
        }
    }

    /// Dispatch a decoded command. An `Err` is sent as a status response
    /// without payload.
    pub fn invoke(
        &self,
        exchange: &mut dyn Exchange,
        command: &NocCommand<'_>,
    ) -> Result<NocCommandResponse, ImStatus> {
        debug!(command = ?command.id(), "Invoke");
        let response = match *command {
            NocCommand::AttestationRequest { nonce } => {
                NocCommandResponse::Attestation(self.attestation_request(exchange, nonce)?)
            }
            NocCommand::CertificateChainRequest { certificate_type } => {
                NocCommandResponse::CertificateChain(
                    self.certificate_chain_request(certificate_type)?,
                )
            }
            NocCommand::CsrRequest(request) => {
                NocCommandResponse::Csr(self.csr_request(exchange, &request)?)
            }
            NocCommand::AddNoc(request) => {
                NocCommandResponse::Noc(self.add_noc(exchange, &request)?)
            }
            NocCommand::UpdateNoc(request) => {
                NocCommandResponse::Noc(self.update_noc(exchange, &request)?)
            }
            NocCommand::UpdateFabricLabel { label } => {
                NocCommandResponse::Noc(self.update_fabric_label(exchange, label)?)
            }
            NocCommand::RemoveFabric { fabric_index } => {
                NocCommandResponse::Noc(self.remove_fabric(exchange, fabric_index)?)
            }
            NocCommand::AddTrustedRootCertificate { root_cert } => {
                self.add_trusted_root_certificate(exchange, root_cert)?;
                NocCommandResponse::Success
            }
        };
        Ok(response)
    }

    pub fn attestation_request(
        &self,
        exchange: &mut dyn Exchange,
        nonce: &[u8],
    ) -> Result<AttestationResponse, ImStatus> {
        info!(cmd = "AttestationRequest", "Command received");
        if nonce.len() != EXPECTED_NONCE_LEN_BYTES {
            warn!(len = nonce.len(), "Invalid attestation nonce");
            return Err(ImStatus::InvalidCommand);
        }
        let dev_att = self.dev_att()?;
        let mut buf = [0u8; MAX_CERT_DECLARATION_LEN];
        let cert_declaration = dev_att
            .get_devatt_data(DataType::CertDeclaration, &mut buf)
            .map_err(|err| {
                error!(%err, "Failed to read the certification declaration");
                ImStatus::Failure
            })?;

        exchange.flush_acks();

        let now = (self.epoch)().as_secs().saturating_sub(MATTER_EPOCH_SECS);
        let timestamp = u32::try_from(now).unwrap_or(u32::MAX);
        let mut elements = Encoder::with_capacity(RESP_MAX);
        elements.start_struct(TagControl::Anonymous);
        elements.write(
            TagControl::ContextSpecific(1),
            TagLengthValue::OctetString(cert_declaration),
        );
        elements.write(
            TagControl::ContextSpecific(2),
            TagLengthValue::OctetString(nonce),
        );
        elements.write(
            TagControl::ContextSpecific(3),
            TagLengthValue::Unsigned32(timestamp),
        );
        elements.end_container();
        if elements.len() > RESP_MAX {
            error!(len = elements.len(), "Attestation elements too large");
            return Err(ImStatus::Failure);
        }

        let attestation_signature = sign_elements(dev_att, exchange, elements.as_slice())?;
        Ok(AttestationResponse {
            attestation_elements: elements.as_slice().to_vec(),
            attestation_signature,
        })
    }

    pub fn certificate_chain_request(
        &self,
        certificate_type: u8,
    ) -> Result<CertificateChainResponse, ImStatus> {
        info!(cmd = "CertificateChainRequest", certificate_type, "Command received");
        let data_type = match CertificateChainType::from_u8(certificate_type) {
            Some(CertificateChainType::Dac) => DataType::Dac,
            Some(CertificateChainType::Pai) => DataType::Pai,
            None => {
                warn!(certificate_type, "Unknown certificate type");
                return Err(ImStatus::InvalidCommand);
            }
        };
        let dev_att = self.dev_att()?;
        let mut buf = [0u8; RESP_MAX];
        let certificate = dev_att.get_devatt_data(data_type, &mut buf).map_err(|err| {
            error!(%err, "Failed to read the certificate");
            ImStatus::Failure
        })?;
        Ok(CertificateChainResponse {
            certificate: certificate.to_vec(),
        })
    }

    pub fn csr_request(
        &self,
        exchange: &mut dyn Exchange,
        request: &CsrRequest<'_>,
    ) -> Result<CsrResponse, ImStatus> {
        info!(
            cmd = "CSRRequest",
            for_update = request.is_for_update_noc,
            "Command received"
        );
        if request.nonce.len() != EXPECTED_NONCE_LEN_BYTES {
            warn!(len = request.nonce.len(), "Invalid CSR nonce");
            return Err(ImStatus::InvalidCommand);
        }
        let accessing_fabric = exchange.accessing_fabric();
        // Updates need a fabric to update
        if request.is_for_update_noc && accessing_fabric.is_none() {
            warn!("CSR for UpdateNOC over a session without a fabric");
            return Err(ImStatus::InvalidCommand);
        }
        {
            let failsafe = self.failsafe.borrow();
            if !failsafe.is_armed_for(accessing_fabric) {
                warn!("Fail-safe not armed for the accessing fabric");
                return Err(ImStatus::FailsafeRequired);
            }
            if failsafe.noc_command_has_been_invoked() {
                warn!("NOC already installed under this fail-safe");
                return Err(ImStatus::ConstraintError);
            }
        }
        let dev_att = self.dev_att()?;

        exchange.flush_acks();

        let update = if request.is_for_update_noc {
            accessing_fabric
        } else {
            None
        };
        let csr = self
            .fabrics
            .borrow_mut()
            .allocate_pending_operational_key(update)
            .map_err(|err| {
                warn!(%err, "Failed to allocate an operational key");
                im_status_for(&err)
            })?;
        self.failsafe
            .borrow_mut()
            .set_csr_request_for_update_noc(request.is_for_update_noc);

        let mut elements = Encoder::with_capacity(RESP_MAX);
        elements.start_struct(TagControl::Anonymous);
        elements.write(TagControl::ContextSpecific(1), TagLengthValue::OctetString(&csr));
        elements.write(
            TagControl::ContextSpecific(2),
            TagLengthValue::OctetString(request.nonce),
        );
        elements.end_container();

        let attestation_signature = sign_elements(dev_att, exchange, elements.as_slice())?;
        Ok(CsrResponse {
            nocsr_elements: elements.as_slice().to_vec(),
            attestation_signature,
        })
    }

    pub fn add_noc(
        &self,
        exchange: &mut dyn Exchange,
        request: &AddNocRequest<'_>,
    ) -> Result<NocResponse, ImStatus> {
        info!(
            cmd = "AddNOC",
            admin_vendor_id = request.admin_vendor_id,
            "Command received"
        );
        check_cert_sizes(request.noc, request.icac)?;
        let Ok(ipk) = <[u8; IPK_LEN_BYTES]>::try_from(request.ipk) else {
            warn!(len = request.ipk.len(), "Invalid IPK");
            return Err(ImStatus::InvalidCommand);
        };
        if !is_vendor_id_valid_operationally(request.admin_vendor_id) {
            warn!(vendor_id = request.admin_vendor_id, "Invalid admin vendor id");
            return Err(ImStatus::InvalidCommand);
        }
        {
            let failsafe = self.failsafe.borrow();
            if !failsafe.is_armed_for(exchange.accessing_fabric()) {
                warn!("Fail-safe not armed for the accessing fabric");
                return Err(ImStatus::FailsafeRequired);
            }
            if failsafe.noc_command_has_been_invoked() {
                warn!("NOC already installed under this fail-safe");
                return Err(ImStatus::ConstraintError);
            }
        }

        match self.add_noc_checked(exchange, request, ipk) {
            Ok(index) => Ok(NocResponse::ok(index)),
            Err(NocError::Status(status)) => {
                warn!(?status, "AddNOC rejected");
                Ok(NocResponse::error(status))
            }
            Err(NocError::Im(status)) => Err(status),
        }
    }

    fn add_noc_checked(
        &self,
        exchange: &mut dyn Exchange,
        request: &AddNocRequest<'_>,
        ipk: [u8; IPK_LEN_BYTES],
    ) -> Result<FabricIndex, NocError> {
        if self.fabrics.borrow().pending_operational_key() != PendingKey::ForAdd {
            warn!("No CSR requested for AddNOC");
            return Err(NocStatus::MissingCsr.into());
        }
        self.dev_att()?;

        exchange.flush_acks();

        // A chain cannot be validated without a root
        if !self.failsafe.borrow().add_trusted_root_has_been_invoked() {
            warn!("AddNOC without a trusted root");
            return Err(NocStatus::InvalidNoc.into());
        }
        if !is_valid_case_admin_subject(request.case_admin_subject) {
            warn!(
                subject = request.case_admin_subject,
                "Invalid CASE admin subject"
            );
            return Err(NocStatus::InvalidAdminSubject.into());
        }

        let mut staged = StagedAddNoc::default();
        let result = self.install_new_fabric(exchange, request, ipk, &mut staged);
        if let Err(err) = &result {
            self.rollback_add_noc(exchange, &staged, err);
        }
        result
    }

    /// Stage the fabric and everything that comes with it. `staged` records
    /// each step as it lands so a failure can be rolled back.
    fn install_new_fabric(
        &self,
        exchange: &mut dyn Exchange,
        request: &AddNocRequest<'_>,
        ipk: [u8; IPK_LEN_BYTES],
        staged: &mut StagedAddNoc,
    ) -> Result<FabricIndex, NocError> {
        let (index, compressed_fabric_id) = {
            let mut fabrics = self.fabrics.borrow_mut();
            let index = fabrics.add_new_pending_fabric_with_operational_keystore(
                request.noc,
                request.icac,
                request.admin_vendor_id,
            )?;
            staged.fabric = Some(index);
            let fabric = fabrics.find(index).ok_or(FabricError::NotFound)?;
            (index, fabric.compressed_fabric_id())
        };

        self.groups.borrow_mut().set_key_set(
            index,
            compressed_fabric_id,
            KeySet::single(IPK_KEY_SET_ID, ipk),
        )?;

        // The ACL entry below belongs to the new fabric, so must the session
        if exchange.session().mode == SessionMode::Pase {
            exchange.adopt_fabric(index).map_err(|err| {
                error!(%err, %index, "Session failed to adopt the new fabric");
                ImStatus::Failure
            })?;
            staged.session_adopted = true;
        }

        self.acl
            .borrow_mut()
            .create_entry(AclEntry::admin(index, request.case_admin_subject)?)?;

        self.failsafe.borrow_mut().set_add_noc_invoked(index);
        self.restart_advertising();
        report_fabric_attributes(self.reporter);
        info!(%index, "Fabric added, pending commissioning complete");
        Ok(index)
    }

    /// Undo a partial AddNOC. The trusted root stays pending, it was staged
    /// by an earlier command.
    fn rollback_add_noc(
        &self,
        exchange: &mut dyn Exchange,
        staged: &StagedAddNoc,
        err: &NocError,
    ) {
        warn!(%err, staged = ?staged.fabric.map(FabricIndex::get), "AddNOC failed, rolling back");
        if staged.session_adopted {
            exchange.release_fabric();
        }
        self.fabrics
            .borrow_mut()
            .revert_pending_op_certs_except_root();
        if let Some(index) = staged.fabric {
            self.groups.borrow_mut().remove_fabric(index);
            self.acl.borrow_mut().delete_all_entries_for_fabric(index);
            report_fabric_attributes(self.reporter);
        }
    }

    pub fn update_noc(
        &self,
        exchange: &mut dyn Exchange,
        request: &UpdateNocRequest<'_>,
    ) -> Result<NocResponse, ImStatus> {
        info!(cmd = "UpdateNOC", "Command received");
        check_cert_sizes(request.noc, request.icac)?;
        {
            let failsafe = self.failsafe.borrow();
            if !failsafe.is_armed_for(exchange.accessing_fabric()) {
                warn!("Fail-safe not armed for the accessing fabric");
                return Err(ImStatus::FailsafeRequired);
            }
            if failsafe.noc_command_has_been_invoked() {
                warn!("NOC already installed under this fail-safe");
                return Err(ImStatus::ConstraintError);
            }
            // A new root only makes sense for a new fabric
            if failsafe.add_trusted_root_has_been_invoked() {
                warn!("UpdateNOC after AddTrustedRootCertificate");
                return Err(ImStatus::ConstraintError);
            }
        }

        match self.update_noc_checked(exchange, request) {
            Ok(index) => Ok(NocResponse::ok(index)),
            Err(NocError::Status(status)) => {
                warn!(?status, "UpdateNOC rejected");
                Ok(NocResponse::error(status))
            }
            Err(NocError::Im(status)) => Err(status),
        }
    }

    fn update_noc_checked(
        &self,
        exchange: &mut dyn Exchange,
        request: &UpdateNocRequest<'_>,
    ) -> Result<FabricIndex, NocError> {
        let Some(index) = exchange.accessing_fabric() else {
            warn!("UpdateNOC over a session without a fabric");
            return Err(NocStatus::InvalidFabricIndex.into());
        };
        if self.fabrics.borrow().pending_operational_key() != PendingKey::ForUpdate(index) {
            warn!(%index, "No CSR requested for UpdateNOC");
            return Err(NocStatus::MissingCsr.into());
        }

        exchange.flush_acks();

        // The table reports the Updated change itself
        self.fabrics
            .borrow_mut()
            .update_pending_fabric_with_operational_keystore(index, request.noc, request.icac)?;
        self.failsafe.borrow_mut().set_update_noc_invoked();
        // The old identity must be withdrawn, not just the new one added
        self.restart_advertising();
        // This exchange survives to deliver the response
        exchange.abort_all_other_communication_on_fabric();
        info!(%index, "Fabric update staged");
        Ok(index)
    }

    pub fn update_fabric_label(
        &self,
        exchange: &mut dyn Exchange,
        label: &str,
    ) -> Result<NocResponse, ImStatus> {
        info!(cmd = "UpdateFabricLabel", label, "Command received");
        if label.len() > MAX_FABRIC_LABEL_LEN {
            warn!(len = label.len(), "Fabric label too long");
            return Err(ImStatus::InvalidCommand);
        }
        let Some(index) = exchange.accessing_fabric() else {
            warn!("UpdateFabricLabel over a session without a fabric");
            return Ok(NocResponse::error(NocStatus::InvalidFabricIndex)
                .with_debug_text("Session has no fabric"));
        };

        let mut fabrics = self.fabrics.borrow_mut();
        if fabrics.label_in_use_by_other(Some(index), label) {
            warn!(%index, label, "Fabric label already in use");
            return Ok(NocResponse {
                status: NocStatus::LabelConflict,
                fabric_index: Some(index),
                debug_text: None,
            }
            .with_debug_text("Label in use by another fabric"));
        }
        fabrics.set_fabric_label(index, label).map_err(|err| {
            error!(%err, %index, "Failed to set the fabric label");
            ImStatus::Failure
        })?;
        Ok(NocResponse::ok(index))
    }

    pub fn remove_fabric(
        &self,
        exchange: &mut dyn Exchange,
        fabric_index: u8,
    ) -> Result<NocResponse, ImStatus> {
        info!(cmd = "RemoveFabric", fabric_index, "Command received");
        let Some(index) = FabricIndex::new(fabric_index) else {
            warn!(fabric_index, "Invalid fabric index");
            return Err(ImStatus::ConstraintError);
        };

        // Leave events, cleanup and reporting run from the table's listeners
        let result = self.fabrics.borrow_mut().delete(index);
        match result {
            Ok(()) => {}
            Err(FabricError::NotFound) => {
                warn!(%index, "No such fabric to remove");
                return Ok(NocResponse {
                    status: NocStatus::InvalidFabricIndex,
                    fabric_index: Some(index),
                    debug_text: None,
                });
            }
            Err(err) => {
                error!(%err, %index, "Failed to remove fabric");
                return Err(ImStatus::Failure);
            }
        }

        if exchange.accessing_fabric() == Some(index) {
            // Removing our own fabric, keep this exchange for the response
            exchange.abort_all_other_communication_on_fabric();
        } else {
            self.sessions
                .borrow_mut()
                .expire_all_sessions_for_fabric(index);
        }
        Ok(NocResponse::ok(index))
    }

    pub fn add_trusted_root_certificate(
        &self,
        exchange: &mut dyn Exchange,
        root_cert: &[u8],
    ) -> Result<(), ImStatus> {
        info!(cmd = "AddTrustedRootCertificate", "Command received");
        let mut failsafe = self.failsafe.borrow_mut();
        if !failsafe.is_armed_for(exchange.accessing_fabric()) {
            warn!("Fail-safe not armed for the accessing fabric");
            return Err(ImStatus::FailsafeRequired);
        }
        if failsafe.add_trusted_root_has_been_invoked() {
            warn!("Trusted root already added under this fail-safe");
            return Err(ImStatus::ConstraintError);
        }
        if failsafe.noc_command_has_been_invoked() {
            warn!("NOC already installed under this fail-safe");
            return Err(ImStatus::ConstraintError);
        }
        if root_cert.len() > MAX_CERT_LEN {
            warn!(len = root_cert.len(), "Root certificate too large");
            return Err(ImStatus::InvalidCommand);
        }
        if let Err(err) = cert::validate_rcac(root_cert) {
            warn!(%err, "Invalid root certificate");
            return Err(ImStatus::InvalidCommand);
        }

        self.fabrics
            .borrow_mut()
            .add_new_pending_trusted_root_cert(root_cert)
            .map_err(|err| {
                warn!(%err, "Failed to stage the trusted root");
                match err {
                    FabricError::IncorrectState => ImStatus::InvalidCommand,
                    err => im_status_for(&err),
                }
            })?;
        failsafe.set_add_trusted_root_invoked();
        Ok(())
    }

    /// NOCs of the accessing fabric. The attribute is fabric-sensitive, so
    /// it is filtered whatever the read asked for.
    pub fn nocs(&self, ctx: &ReadContext) -> Vec<NocStruct> {
        self.fabrics
            .borrow()
            .iter()
            .filter(|fabric| Some(fabric.index()) == ctx.accessing_fabric)
            .map(NocStruct::from)
            .collect()
    }

    pub fn fabric_descriptors(&self, ctx: &ReadContext) -> Vec<FabricDescriptor> {
        self.fabrics
            .borrow()
            .iter()
            .filter(|fabric| !ctx.fabric_filtered || Some(fabric.index()) == ctx.accessing_fabric)
            .map(FabricInfo::descriptor)
            .collect()
    }

    pub fn supported_fabrics(&self) -> u8 {
        self.config.supported_fabrics
    }

    /// Fabrics in the table, a fabric pending addition included.
    pub fn commissioned_fabrics(&self) -> u8 {
        u8::try_from(self.fabrics.borrow().fabric_count()).unwrap_or(u8::MAX)
    }

    pub fn trusted_root_certificates(&self) -> Vec<Vec<u8>> {
        self.fabrics
            .borrow()
            .trusted_root_certs()
            .into_iter()
            .map(<[u8]>::to_vec)
            .collect()
    }

    /// 0 when the reading session has no fabric.
    pub fn current_fabric_index(&self, ctx: &ReadContext) -> u8 {
        ctx.accessing_fabric.map_or(0, FabricIndex::get)
    }

    /// Encode attribute `attr_id` under `tag`.
    pub fn read(
        &self,
        ctx: &ReadContext,
        attr_id: u16,
        tag: TagControl,
        encoder: &mut Encoder,
    ) -> Result<(), ImStatus> {
        let Some(attr) = Attributes::from_u16(attr_id) else {
            return match GlobalAttributes::from_u16(attr_id) {
                Some(global) => CLUSTER.read_global(global, tag, encoder),
                None => Err(ImStatus::UnsupportedAttribute),
            };
        };
        match attr {
            Attributes::Nocs => {
                encoder.start_array(tag);
                for noc in self.nocs(ctx) {
                    noc.to_tlv(encoder, TagControl::Anonymous);
                }
                encoder.end_container();
            }
            Attributes::Fabrics => {
                encoder.start_array(tag);
                for descriptor in self.fabric_descriptors(ctx) {
                    write_fabric_descriptor(encoder, TagControl::Anonymous, &descriptor);
                }
                encoder.end_container();
            }
            Attributes::SupportedFabrics => {
                encoder.write(tag, TagLengthValue::Unsigned8(self.supported_fabrics()))
            }
            Attributes::CommissionedFabrics => {
                encoder.write(tag, TagLengthValue::Unsigned8(self.commissioned_fabrics()))
            }
            Attributes::TrustedRootCertificates => {
                encoder.start_array(tag);
                for root in self.trusted_root_certificates() {
                    encoder.write(TagControl::Anonymous, TagLengthValue::OctetString(&root));
                }
                encoder.end_container();
            }
            Attributes::CurrentFabricIndex => {
                encoder.write(tag, TagLengthValue::Unsigned8(self.current_fabric_index(ctx)))
            }
        }
        Ok(())
    }

    fn dev_att(&self) -> Result<&'a dyn DevAttDataFetcher, ImStatus> {
        self.dev_att.ok_or_else(|| {
            error!("No device attestation provider");
            ImStatus::Failure
        })
    }

    fn restart_advertising(&self) {
        let instances = operational_instances(&self.fabrics.borrow());
        if let Err(err) = self.advertiser.restart(&instances) {
            warn!(%err, "Failed to restart operational advertisement");
        }
    }
}

fn check_cert_sizes(noc: &[u8], icac: Option<&[u8]>) -> Result<(), ImStatus> {
    let icac_len = icac.map_or(0, <[u8]>::len);
    if noc.len() > MAX_CERT_LEN || icac_len > MAX_CERT_LEN {
        warn!(noc = noc.len(), icac = icac_len, "Certificate too large");
        return Err(ImStatus::InvalidCommand);
    }
    Ok(())
}

/// Sign `elements` followed by the session's attestation challenge.
fn sign_elements(
    dev_att: &dyn DevAttDataFetcher,
    exchange: &dyn Exchange,
    elements: &[u8],
) -> Result<[u8; EC_SIGNATURE_LEN_BYTES], ImStatus> {
    let challenge = exchange.session().attestation_challenge;
    let mut message = Vec::with_capacity(elements.len() + challenge.len());
    message.extend_from_slice(elements);
    message.extend_from_slice(&challenge);
    sign_with_dac(dev_att, &message).map_err(|err| {
        error!(%err, "Attestation signing failed");
        ImStatus::Failure
    })
}
