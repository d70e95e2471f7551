#![allow(dead_code)]

use core::{cell::Cell, cell::RefCell, time::Duration};

use matter_opcreds::{
    acl::AclTable,
    cert::issue::{csr_public_key, CertIssuer},
    cluster::utility::{
        general_commissioning::GeneralCommissioningCluster,
        node_operational_cred::{
            AddNocRequest, CsrRequest, CsrResponse, FabricChangeNotifier, FabricStateCleanup,
            NocCluster, NocResponse,
        },
    },
    config::DeviceConfig,
    crypto::KeyPair,
    data_model::{device::Node, endpoint::root_endpoint},
    dev_att::{DevAttCredentials, DevAttDataFetcher},
    exchange::SessionExchange,
    fabric::{FabricIndex, FabricTable},
    failsafe::FailSafeContext,
    group_keys::GroupKeyStore,
    interaction_model::{events::EventLog, reporting::ReportingQueue},
    session_context::{SessionId, SessionTable},
    transport::AdvertisedInstances,
};

pub const CERT_DECLARATION: &[u8] = &[0xCD; 64];
pub const IPK: [u8; 16] = [0x4A; 16];
pub const ADMIN_SUBJECT: u64 = 0x0000_0000_0001_B669;
pub const ADMIN_VENDOR_ID: u16 = 0x1234;

thread_local! {
    static NOW: Cell<Duration> = Cell::new(Duration::from_secs(1_700_000_000));
}

/// Test clock, one per test thread.
pub fn test_epoch() -> Duration {
    NOW.with(Cell::get)
}

pub fn advance(by: Duration) {
    NOW.with(|now| now.set(now.get() + by));
}

/// A commissioner holding the root CA of one fabric.
pub struct Commissioner {
    pub root: CertIssuer,
    pub fabric_id: u64,
}

impl Commissioner {
    pub fn new(rcac_id: u64, fabric_id: u64) -> Self {
        Self {
            root: CertIssuer::new_root(rcac_id, Some(fabric_id)).unwrap(),
            fabric_id,
        }
    }

    /// Issue a NOC for the CSR carried in NOCSR elements.
    pub fn noc_for(&self, response: &CsrResponse, node_id: u64) -> Vec<u8> {
        let csr = context_octets(&response.nocsr_elements, 1).unwrap();
        let public_key = csr_public_key(csr).unwrap();
        self.root
            .issue_noc(&public_key, node_id, self.fabric_id)
            .unwrap()
    }
}

/// Pull the octet string under context tag `tag` out of an anonymous TLV
/// structure of octet strings and unsigned integers.
pub fn context_octets(tlv: &[u8], tag: u8) -> Option<&[u8]> {
    assert_eq!(tlv.first(), Some(&0x15));
    let mut pos = 1;
    while pos < tlv.len() && tlv[pos] != 0x18 {
        let control = tlv[pos];
        let element_tag = tlv[pos + 1];
        pos += 2;
        let value = match control & 0x1F {
            0x04 => 1,
            0x05 => 2,
            0x06 => 4,
            0x07 => 8,
            0x10 => {
                let len = tlv[pos] as usize;
                pos += 1;
                len
            }
            0x11 => {
                let len = u16::from_le_bytes([tlv[pos], tlv[pos + 1]]) as usize;
                pos += 2;
                len
            }
            other => panic!("unexpected element type {other:#x}"),
        };
        if element_tag == tag {
            return Some(&tlv[pos..pos + value]);
        }
        pos += value;
    }
    None
}

/// Everything a node wires around the two clusters.
pub struct Harness<'a> {
    pub sessions: &'a RefCell<SessionTable>,
    pub groups: &'a RefCell<GroupKeyStore>,
    pub acl: &'a RefCell<AclTable>,
    pub reporter: &'a ReportingQueue,
    pub events: &'a EventLog,
    pub advertiser: &'a AdvertisedInstances,
    pub fabrics: &'a RefCell<FabricTable<'a>>,
    pub failsafe: &'a RefCell<FailSafeContext>,
    pub dac: &'a KeyPair,
    pub dac_cert: &'a [u8],
    pub pai_cert: &'a [u8],
    pub noc: NocCluster<'a>,
    pub commissioning: GeneralCommissioningCluster<'a>,
}

pub fn with_harness<R>(config: DeviceConfig, f: impl FnOnce(&Harness<'_>) -> R) -> R {
    let sessions = RefCell::new(SessionTable::new());
    let groups = RefCell::new(GroupKeyStore::new(&config));
    let acl = RefCell::new(AclTable::new(&config));
    let reporter = ReportingQueue::default();
    let events = EventLog::new();
    let advertiser = AdvertisedInstances::new();
    let node = Node {
        id: 1,
        endpoints: &[root_endpoint::endpoint(0)],
    };

    let dac = KeyPair::new();
    let pai = CertIssuer::new_root(0xA1, None).unwrap();
    let dac_cert = pai.issue_noc(&dac.public_key(), 0x0D, 0x0D).unwrap();
    let dev_att = DevAttCredentials::new(
        CERT_DECLARATION,
        pai.cert(),
        &dac_cert,
        &dac.public_key(),
        &dac.private_key_bytes().unwrap(),
    )
    .unwrap();

    let notifier = FabricChangeNotifier::new(&node, &reporter, &events, &advertiser);
    let cleanup = FabricStateCleanup::new(&groups, &acl);
    let fabrics = RefCell::new(FabricTable::new(config.supported_fabrics));
    fabrics.borrow_mut().add_listener(&notifier);
    fabrics.borrow_mut().add_listener(&cleanup);
    let failsafe = RefCell::new(FailSafeContext::new(&config));

    let noc = NocCluster::new(
        &config,
        &fabrics,
        &failsafe,
        &groups,
        &acl,
        &sessions,
        &reporter,
        &advertiser,
        Some(&dev_att as &dyn DevAttDataFetcher),
        test_epoch,
    );
    let commissioning =
        GeneralCommissioningCluster::new(&config, &fabrics, &failsafe, &sessions, test_epoch);

    let harness = Harness {
        sessions: &sessions,
        groups: &groups,
        acl: &acl,
        reporter: &reporter,
        events: &events,
        advertiser: &advertiser,
        fabrics: &fabrics,
        failsafe: &failsafe,
        dac: &dac,
        dac_cert: &dac_cert,
        pai_cert: pai.cert(),
        noc,
        commissioning,
    };
    f(&harness)
}

impl<'a> Harness<'a> {
    pub fn pase(&self) -> SessionId {
        self.sessions.borrow_mut().add_pase()
    }

    pub fn case(&self, fabric: FabricIndex, peer_node_id: u64) -> SessionId {
        self.sessions.borrow_mut().add_case(fabric, peer_node_id)
    }

    pub fn exchange(&self, session: SessionId) -> SessionExchange<'a> {
        SessionExchange::new(self.sessions, session).unwrap()
    }

    pub fn arm(&self, exchange: &mut SessionExchange<'_>) {
        let response = self.commissioning.arm_fail_safe(exchange, 60, 1);
        assert!(response.is_ok(), "{response:?}");
    }

    pub fn csr(&self, exchange: &mut SessionExchange<'_>, for_update: bool) -> CsrResponse {
        self.noc
            .csr_request(
                exchange,
                &CsrRequest {
                    nonce: &[0x11; 32],
                    is_for_update_noc: for_update,
                },
            )
            .unwrap()
    }

    /// Root, CSR and AddNOC over an armed fail-safe.
    pub fn add_noc(
        &self,
        exchange: &mut SessionExchange<'_>,
        commissioner: &Commissioner,
        node_id: u64,
    ) -> NocResponse {
        self.noc
            .add_trusted_root_certificate(exchange, commissioner.root.cert())
            .unwrap();
        let csr = self.csr(exchange, false);
        let noc = commissioner.noc_for(&csr, node_id);
        self.noc
            .add_noc(exchange, &add_noc_request(&noc, &IPK))
            .unwrap()
    }

    /// Commission a new fabric end to end over a fresh PASE session. Returns
    /// the fabric and the CASE session CommissioningComplete arrived on.
    pub fn commission(&self, commissioner: &Commissioner, node_id: u64) -> (FabricIndex, SessionId) {
        let mut pase = self.exchange(self.pase());
        self.arm(&mut pase);
        let response = self.add_noc(&mut pase, commissioner, node_id);
        assert!(response.is_ok(), "{response:?}");
        let fabric = response.fabric_index.unwrap();

        let case = self.case(fabric, ADMIN_SUBJECT);
        let complete = self
            .commissioning
            .commissioning_complete(&mut self.exchange(case))
            .unwrap();
        assert!(complete.is_ok(), "{complete:?}");
        (fabric, case)
    }
}

pub fn add_noc_request<'r>(noc: &'r [u8], ipk: &'r [u8]) -> AddNocRequest<'r> {
    AddNocRequest {
        noc,
        icac: None,
        ipk,
        case_admin_subject: ADMIN_SUBJECT,
        admin_vendor_id: ADMIN_VENDOR_ID,
    }
}
