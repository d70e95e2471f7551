//! General Commissioning cluster (11.10)
//!
//! Owns the fail-safe from the commissioner's point of view: ArmFailSafe
//! opens (or extends) the window in which credentials may be staged, and
//! CommissioningComplete makes them permanent.

use core::{
    cell::{Cell, RefCell},
    time::Duration,
};

use num::FromPrimitive;
use tracing::{error, info, warn};

use crate::{
    acl::Privilege,
    cluster::{
        Cluster, ClusterClassification, GlobalAttributes, ATTR_ATTRIBUTE_LIST,
        ATTR_CLUSTER_REVISION, ATTR_FEATURE_MAP,
    },
    config::DeviceConfig,
    data_model::{Attribute, AttributeQuality},
    exchange::Exchange,
    fabric::FabricTable,
    failsafe::{fail_safe_cleanup, FailSafeContext, FailSafeError, FailSafeExpiry},
    interaction_model::ImStatus,
    session_context::{SessionManager, SessionMode},
    tlv::{Encoder, TagControl, TagLengthValue},
    util::time::Epoch,
};

pub const CLUSTER_ID: u16 = 0x0030;

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
            Attributes::Breadcrumb as _,
            AttributeQuality::empty(),
            Privilege::View,
        ),
        Attribute::new(
            Attributes::BasicCommissioningInfo as _,
            AttributeQuality::FIXED,
            Privilege::View,
        ),
        Attribute::new(
            Attributes::RegulatoryConfig as _,
            AttributeQuality::empty(),
            Privilege::View,
        ),
        Attribute::new(
            Attributes::LocationCapability as _,
            AttributeQuality::FIXED,
            Privilege::View,
        ),
        Attribute::new(
            Attributes::SupportsConcurrentConnection as _,
            AttributeQuality::FIXED,
            Privilege::View,
        ),
    ],
    commands: &[
        Commands::ArmFailSafe as _,
        Commands::CommissioningComplete as _,
    ],
    generated_commands: &[
        RespCommands::ArmFailSafeResponse as _,
        RespCommands::CommissioningCompleteResponse as _,
    ],
};

#[repr(u16)]
#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attributes {
    Breadcrumb = 0,
    BasicCommissioningInfo,
    RegulatoryConfig,
    LocationCapability,
    SupportsConcurrentConnection,
}

#[repr(u8)]
#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    ArmFailSafe = 0x00,
    CommissioningComplete = 0x04,
}

#[repr(u8)]
#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RespCommands {
    ArmFailSafeResponse = 0x01,
    CommissioningCompleteResponse = 0x05,
}

/// CommissioningErrorEnum (11.10.4.1)
#[repr(u8)]
#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommissioningError {
    Ok = 0,
    ValueOutsideRange = 1,
    InvalidAuthentication = 2,
    NoFailSafe = 3,
    BusyWithOtherAdmin = 4,
}

/// RegulatoryLocationTypeEnum (11.10.4.2)
#[repr(u8)]
#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegulatoryLocationType {
    Indoor = 0,
    Outdoor = 1,
    IndoorOutdoor = 2,
}

/// BasicCommissioningInfo (11.10.5.2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicCommissioningInfo {
    pub fail_safe_expiry_length_seconds: u16,
    pub max_cumulative_failsafe_seconds: u16,
}

impl BasicCommissioningInfo {
    pub fn to_tlv(&self, encoder: &mut Encoder, tag: TagControl) {
        encoder.start_struct(tag);
        encoder.write(
            TagControl::ContextSpecific(0),
            TagLengthValue::Unsigned16(self.fail_safe_expiry_length_seconds),
        );
        encoder.write(
            TagControl::ContextSpecific(1),
            TagLengthValue::Unsigned16(self.max_cumulative_failsafe_seconds),
        );
        encoder.end_container();
    }
}

/// A decoded command addressed to the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneralCommissioningCommand {
    ArmFailSafe {
        expiry_length_seconds: u16,
        breadcrumb: u64,
    },
    CommissioningComplete,
}

/// ArmFailSafeResponse and CommissioningCompleteResponse share this shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommissioningResponse {
    pub error_code: CommissioningError,
}

impl CommissioningResponse {
    pub const fn new(error_code: CommissioningError) -> Self {
        Self { error_code }
    }

    pub fn is_ok(&self) -> bool {
        self.error_code == CommissioningError::Ok
    }

    pub fn to_tlv(&self, encoder: &mut Encoder, tag: TagControl) {
        encoder.start_struct(tag);
        encoder.write(
            TagControl::ContextSpecific(0),
            TagLengthValue::Unsigned8(self.error_code as u8),
        );
        encoder.write(TagControl::ContextSpecific(1), TagLengthValue::String(""));
        encoder.end_container();
    }
}

fn secs_u16(duration: Duration) -> u16 {
    u16::try_from(duration.as_secs()).unwrap_or(u16::MAX)
}

pub struct GeneralCommissioningCluster<'a> {
    config: &'a DeviceConfig,
    fabrics: &'a RefCell<FabricTable<'a>>,
    failsafe: &'a RefCell<FailSafeContext>,
    sessions: &'a RefCell<dyn SessionManager>,
    epoch: Epoch,
    breadcrumb: Cell<u64>,
}

impl<'a> GeneralCommissioningCluster<'a> {
    pub fn new(
        config: &'a DeviceConfig,
        fabrics: &'a RefCell<FabricTable<'a>>,
        failsafe: &'a RefCell<FailSafeContext>,
        sessions: &'a RefCell<dyn SessionManager>,
        epoch: Epoch,
    ) -> Self {
        Self {
            config,
            fabrics,
            failsafe,
            sessions,
            epoch,
            breadcrumb: Cell::new(0),
        }
    }

    pub fn invoke(
        &self,
        exchange: &mut dyn Exchange,
        command: &GeneralCommissioningCommand,
    ) -> Result<CommissioningResponse, ImStatus> {
        match *command {
            GeneralCommissioningCommand::ArmFailSafe {
                expiry_length_seconds,
                breadcrumb,
            } => Ok(self.arm_fail_safe(exchange, expiry_length_seconds, breadcrumb)),
            GeneralCommissioningCommand::CommissioningComplete => {
                self.commissioning_complete(exchange)
            }
        }
    }

    /// Arm or extend the fail-safe. An expiry of 0 disarms it, undoing
    /// whatever was staged.
    ///
    /// The caller drives the expiry: schedule [`Self::on_fail_safe_timer_expired`]
    /// for [`Self::fail_safe_deadline`], or call [`Self::poll`] periodically.
    pub fn arm_fail_safe(
        &self,
        exchange: &mut dyn Exchange,
        expiry_length_seconds: u16,
        breadcrumb: u64,
    ) -> CommissioningResponse {
        info!(
            cmd = "ArmFailSafe",
            expiry_length_seconds,
            breadcrumb,
            "Command received"
        );
        let accessing_fabric = exchange.accessing_fabric();

        if expiry_length_seconds == 0 {
            let expiry = {
                let mut failsafe = self.failsafe.borrow_mut();
                if failsafe.is_armed() && !failsafe.is_armed_for(accessing_fabric) {
                    warn!("Fail-safe is armed by another administrator");
                    return CommissioningResponse::new(CommissioningError::BusyWithOtherAdmin);
                }
                failsafe.force_expiry()
            };
            if let Some(expiry) = expiry {
                self.cleanup(&expiry);
            }
            self.breadcrumb.set(breadcrumb);
            return CommissioningResponse::new(CommissioningError::Ok);
        }

        let expiry = Duration::from_secs(expiry_length_seconds.into());
        let armed = self
            .failsafe
            .borrow_mut()
            .arm(accessing_fabric, expiry, (self.epoch)());
        match armed {
            Ok(()) => {
                self.breadcrumb.set(breadcrumb);
                CommissioningResponse::new(CommissioningError::Ok)
            }
            Err(FailSafeError::BusyWithOtherAdmin) => {
                warn!("Fail-safe is armed by another administrator");
                CommissioningResponse::new(CommissioningError::BusyWithOtherAdmin)
            }
        }
    }

    /// Commit what was staged under the fail-safe and disarm it.
    pub fn commissioning_complete(
        &self,
        exchange: &mut dyn Exchange,
    ) -> Result<CommissioningResponse, ImStatus> {
        info!(cmd = "CommissioningComplete", "Command received");
        let session = exchange.session();
        let mut failsafe = self.failsafe.borrow_mut();
        if !failsafe.is_armed() {
            warn!("CommissioningComplete without a fail-safe");
            return Ok(CommissioningResponse::new(CommissioningError::NoFailSafe));
        }
        if session.mode != SessionMode::Case || !failsafe.is_armed_for(session.fabric_index) {
            warn!(mode = ?session.mode, "CommissioningComplete from the wrong session");
            return Ok(CommissioningResponse::new(
                CommissioningError::InvalidAuthentication,
            ));
        }

        {
            let mut fabrics = self.fabrics.borrow_mut();
            if failsafe.noc_command_has_been_invoked() {
                fabrics.commit_pending_fabric_data().map_err(|err| {
                    error!(%err, "Failed to commit the pending fabric");
                    ImStatus::Failure
                })?;
            } else {
                // A root or key staged without a NOC is of no use
                fabrics.revert_pending_fabric_data();
            }
        }
        failsafe.disarm();
        drop(failsafe);

        self.sessions.borrow_mut().expire_all_pase_sessions();
        self.breadcrumb.set(0);
        info!("Commissioning complete");
        Ok(CommissioningResponse::new(CommissioningError::Ok))
    }

    /// The fail-safe timer fired.
    pub fn on_fail_safe_timer_expired(&self) {
        let expiry = self.failsafe.borrow_mut().force_expiry();
        if let Some(expiry) = expiry {
            self.cleanup(&expiry);
        }
    }

    /// Expire the fail-safe if its deadline has passed.
    pub fn poll(&self) {
        let expiry = self.failsafe.borrow_mut().poll_expiry((self.epoch)());
        if let Some(expiry) = expiry {
            self.cleanup(&expiry);
        }
    }

    /// Time left until the fail-safe expires, `None` when disarmed.
    pub fn fail_safe_deadline(&self) -> Option<Duration> {
        let deadline = self.failsafe.borrow().deadline()?;
        Some(deadline.saturating_sub((self.epoch)()))
    }

    fn cleanup(&self, expiry: &FailSafeExpiry) {
        fail_safe_cleanup(
            expiry,
            &mut self.fabrics.borrow_mut(),
            &mut *self.sessions.borrow_mut(),
        );
        self.breadcrumb.set(0);
    }

    pub fn breadcrumb(&self) -> u64 {
        self.breadcrumb.get()
    }

    pub fn basic_commissioning_info(&self) -> BasicCommissioningInfo {
        BasicCommissioningInfo {
            fail_safe_expiry_length_seconds: secs_u16(self.config.fail_safe_expiry),
            max_cumulative_failsafe_seconds: secs_u16(self.config.max_cumulative_fail_safe),
        }
    }

    pub fn read(&self, attr_id: u16, tag: TagControl, encoder: &mut Encoder) -> Result<(), ImStatus> {
        let Some(attr) = Attributes::from_u16(attr_id) else {
            return match GlobalAttributes::from_u16(attr_id) {
                Some(global) => CLUSTER.read_global(global, tag, encoder),
                None => Err(ImStatus::UnsupportedAttribute),
            };
        };
        match attr {
            Attributes::Breadcrumb => {
                encoder.write(tag, TagLengthValue::Unsigned64(self.breadcrumb()))
            }
            Attributes::BasicCommissioningInfo => {
                self.basic_commissioning_info().to_tlv(encoder, tag)
            }
            Attributes::RegulatoryConfig | Attributes::LocationCapability => encoder.write(
                tag,
                TagLengthValue::Unsigned8(RegulatoryLocationType::IndoorOutdoor as u8),
            ),
            Attributes::SupportsConcurrentConnection => {
                encoder.write(tag, TagLengthValue::Boolean(true))
            }
        }
        Ok(())
    }
}
