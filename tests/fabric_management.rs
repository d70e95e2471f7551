mod common;

use hex_literal::hex;
use matter_opcreds::{
    acl::AccessControl,
    cluster::{
        utility::{
            basic_information,
            node_operational_cred::{
                Attributes, CsrRequest, NocResponse, NocStatus, UpdateNocRequest,
            },
        },
        GlobalAttributes,
    },
    config::DeviceConfig,
    fabric::FabricIndex,
    interaction_model::{ImStatus, ReadContext},
    tlv::{Encoder, TagControl},
};

use common::*;

fn read(h: &Harness<'_>, ctx: &ReadContext, attr_id: u16) -> Result<Vec<u8>, ImStatus> {
    let mut encoder = Encoder::with_capacity(1024);
    h.noc
        .read(ctx, attr_id, TagControl::ContextSpecific(2), &mut encoder)?;
    Ok(encoder.as_slice().to_vec())
}

fn assert_label_conflict(response: NocResponse, caller: FabricIndex) {
    assert_eq!(response.status, NocStatus::LabelConflict);
    assert_eq!(response.fabric_index, Some(caller));
    assert_eq!(
        response.debug_text.as_deref(),
        Some("Label in use by another fabric")
    );
}

#[test]
fn test_fabric_labels() {
    with_harness(DeviceConfig::default(), |h| {
        let (a, case_a) = h.commission(&Commissioner::new(1, 0xFAB1), 0x1122);
        let (b, case_b) = h.commission(&Commissioner::new(2, 0xFAB2), 0x1122);
        let mut exchange_a = h.exchange(case_a);
        let mut exchange_b = h.exchange(case_b);

        // Setting your own label again is allowed, but a label shared with
        // another fabric conflicts. Both fabrics start with the empty label,
        // so re-setting "" hits both rules and the conflict wins.
        assert_label_conflict(
            h.noc.update_fabric_label(&mut exchange_a, "").unwrap(),
            a,
        );

        h.reporter.drain();
        assert_eq!(
            h.noc.update_fabric_label(&mut exchange_a, "Kitchen").unwrap(),
            NocResponse::ok(a)
        );
        assert_eq!(
            h.reporter.drain(),
            Some(vec![
                Attributes::Fabrics.path(),
                Attributes::CommissionedFabrics.path()
            ])
        );
        assert_label_conflict(
            h.noc.update_fabric_label(&mut exchange_b, "Kitchen").unwrap(),
            b,
        );
        // A fabric never conflicts with itself
        assert_eq!(
            h.noc.update_fabric_label(&mut exchange_a, "Kitchen").unwrap(),
            NocResponse::ok(a)
        );

        let longest = "x".repeat(32);
        assert_eq!(
            h.noc.update_fabric_label(&mut exchange_b, &longest).unwrap(),
            NocResponse::ok(b)
        );
        assert_eq!(
            h.noc
                .update_fabric_label(&mut exchange_b, &"x".repeat(33)),
            Err(ImStatus::InvalidCommand)
        );

        let labels: Vec<_> = h
            .noc
            .fabric_descriptors(&ReadContext::default())
            .into_iter()
            .map(|d| (d.fabric_index, d.label.as_str().to_owned()))
            .collect();
        assert_eq!(labels, vec![(a, "Kitchen".to_owned()), (b, longest)]);

        let mut pase = h.exchange(h.pase());
        let response = h.noc.update_fabric_label(&mut pase, "Hall").unwrap();
        assert_eq!(response.status, NocStatus::InvalidFabricIndex);
        assert_eq!(response.fabric_index, None);
        assert!(response.debug_text.is_some());
    });
}

#[test]
fn test_remove_other_fabric() {
    with_harness(DeviceConfig::default(), |h| {
        let (a, case_a) = h.commission(&Commissioner::new(1, 0xFAB1), 0x1122);
        let (b, case_b) = h.commission(&Commissioner::new(2, 0xFAB2), 0x1122);
        let other_b = h.case(b, 0x77);
        let mut exchange = h.exchange(case_a);

        let response = h.noc.remove_fabric(&mut exchange, b.get()).unwrap();
        assert_eq!(response, NocResponse::ok(b));
        assert_eq!(h.noc.commissioned_fabrics(), 1);
        assert!(!h.sessions.borrow().is_active(case_b));
        assert!(!h.sessions.borrow().is_active(other_b));
        assert!(h.sessions.borrow().is_active(case_a));
        assert!(h.acl.borrow().entries(b).is_empty());
        assert_eq!(h.acl.borrow().entries(a).len(), 1);
        assert_eq!(h.advertiser.instances().len(), 1);

        let delivered = h.events.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].fabric, b);
        assert_eq!(delivered[0].event, basic_information::Events::Leave as u32);

        // Already gone
        let response = h.noc.remove_fabric(&mut exchange, b.get()).unwrap();
        assert_eq!(response.status, NocStatus::InvalidFabricIndex);
        assert_eq!(response.fabric_index, Some(b));

        assert_eq!(
            h.noc.remove_fabric(&mut exchange, 0),
            Err(ImStatus::ConstraintError)
        );
        assert_eq!(
            h.noc.remove_fabric(&mut exchange, 255),
            Err(ImStatus::ConstraintError)
        );
    });
}

#[test]
fn test_remove_own_fabric() {
    with_harness(DeviceConfig::default(), |h| {
        let (a, case_a) = h.commission(&Commissioner::new(1, 0xFAB1), 0x1122);
        let other_a = h.case(a, 0x77);
        let mut exchange = h.exchange(case_a);

        let response = h.noc.remove_fabric(&mut exchange, a.get()).unwrap();
        assert_eq!(response, NocResponse::ok(a));
        assert_eq!(h.noc.commissioned_fabrics(), 0);
        assert!(h.noc.trusted_root_certificates().is_empty());
        // Stays up to carry the response
        assert!(h.sessions.borrow().is_active(case_a));
        assert!(!h.sessions.borrow().is_active(other_a));
        assert!(h.groups.borrow().is_empty());
        assert!(h.acl.borrow().is_empty());
        assert!(h.advertiser.instances().is_empty());
    });
}

#[test]
fn test_update_noc() {
    with_harness(DeviceConfig::default(), |h| {
        let commissioner = Commissioner::new(1, 0xFAB1);
        let (a, case) = h.commission(&commissioner, 0x1122);
        let other = h.case(a, 0x99);
        let mut exchange = h.exchange(case);
        h.arm(&mut exchange);

        let csr = h.csr(&mut exchange, true);
        assert!(h.failsafe.borrow().is_csr_request_for_update_noc());
        let noc = commissioner.noc_for(&csr, 0x3344);
        let response = h
            .noc
            .update_noc(&mut exchange, &UpdateNocRequest { noc: &noc, icac: None })
            .unwrap();
        assert_eq!(response, NocResponse::ok(a));
        assert!(h.failsafe.borrow().update_noc_has_been_invoked());
        assert!(h.sessions.borrow().is_active(case));
        assert!(!h.sessions.borrow().is_active(other));
        assert_eq!(h.fabrics.borrow().find(a).unwrap().node_id(), 0x3344);
        let instances = h.advertiser.instances();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].node_id, 0x3344);

        let complete = h
            .commissioning
            .commissioning_complete(&mut exchange)
            .unwrap();
        assert!(complete.is_ok());
        assert!(!h.fabrics.borrow().has_pending_fabric());
        assert_eq!(h.fabrics.borrow().find(a).unwrap().node_id(), 0x3344);

        let ctx = ReadContext {
            accessing_fabric: Some(a),
            fabric_filtered: true,
        };
        let nocs = h.noc.nocs(&ctx);
        assert_eq!(nocs.len(), 1);
        assert_eq!(nocs[0].noc, noc);
    });
}

#[test]
fn test_update_noc_checks() {
    with_harness(DeviceConfig::default(), |h| {
        let commissioner = Commissioner::new(1, 0xFAB1);
        let (_, case) = h.commission(&commissioner, 0x1122);

        // Updates need a fabric, checked before the fail-safe
        let mut pase = h.exchange(h.pase());
        assert_eq!(
            h.noc.csr_request(
                &mut pase,
                &CsrRequest {
                    nonce: &[0x11; 32],
                    is_for_update_noc: true,
                }
            ),
            Err(ImStatus::InvalidCommand)
        );

        let mut exchange = h.exchange(case);
        h.arm(&mut exchange);
        let csr = h.csr(&mut exchange, false);
        let noc = commissioner.noc_for(&csr, 0x3344);
        let response = h
            .noc
            .update_noc(&mut exchange, &UpdateNocRequest { noc: &noc, icac: None })
            .unwrap();
        assert_eq!(response.status, NocStatus::MissingCsr);

        let new_root = Commissioner::new(2, 0xFAB2);
        h.noc
            .add_trusted_root_certificate(&mut exchange, new_root.root.cert())
            .unwrap();
        assert_eq!(
            h.noc
                .update_noc(&mut exchange, &UpdateNocRequest { noc: &noc, icac: None }),
            Err(ImStatus::ConstraintError)
        );
        assert_eq!(
            h.noc.update_noc(
                &mut exchange,
                &UpdateNocRequest {
                    noc: &[0x30; 401],
                    icac: None,
                }
            ),
            Err(ImStatus::InvalidCommand)
        );
    });
}

#[test]
fn test_table_full() {
    let config = DeviceConfig::default().with_supported_fabrics(1);
    with_harness(config, |h| {
        h.commission(&Commissioner::new(1, 0xFAB1), 0x1122);
        let mut exchange = h.exchange(h.pase());
        h.arm(&mut exchange);
        assert_eq!(
            h.noc.csr_request(
                &mut exchange,
                &CsrRequest {
                    nonce: &[0x11; 32],
                    is_for_update_noc: false,
                }
            ),
            Err(ImStatus::ResourceExhausted)
        );
        assert_eq!(h.noc.supported_fabrics(), 1);
        assert_eq!(h.noc.commissioned_fabrics(), 1);
    });
}

#[test]
fn test_attribute_reads() {
    let config = DeviceConfig::default().with_supported_fabrics(3);
    with_harness(config, |h| {
        let (a, _) = h.commission(&Commissioner::new(1, 0xFAB1), 0x1122);
        let (b, _) = h.commission(&Commissioner::new(2, 0xFAB2), 0x5566);
        let filtered = ReadContext {
            accessing_fabric: Some(a),
            fabric_filtered: true,
        };
        let unfiltered = ReadContext {
            accessing_fabric: Some(a),
            fabric_filtered: false,
        };

        // Fabric-sensitive, filtered either way
        for ctx in [&filtered, &unfiltered] {
            let nocs = h.noc.nocs(ctx);
            assert_eq!(nocs.len(), 1);
            assert_eq!(nocs[0].fabric_index, a);
            assert_eq!(nocs[0].icac, None);
        }
        assert_eq!(
            read(h, &ReadContext::default(), Attributes::Nocs as u16),
            Ok(hex!("3602 18").to_vec())
        );

        let descriptors = h.noc.fabric_descriptors(&filtered);
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].fabric_id, 0xFAB1);
        assert_eq!(descriptors[0].node_id, 0x1122);
        assert_eq!(descriptors[0].vendor_id, ADMIN_VENDOR_ID);
        let indices: Vec<_> = h
            .noc
            .fabric_descriptors(&unfiltered)
            .iter()
            .map(|d| d.fabric_index)
            .collect();
        assert_eq!(indices, vec![a, b]);

        assert_eq!(h.noc.current_fabric_index(&filtered), a.get());
        assert_eq!(h.noc.current_fabric_index(&ReadContext::default()), 0);
        assert_eq!(h.noc.trusted_root_certificates().len(), 2);

        assert_eq!(
            read(h, &filtered, Attributes::SupportedFabrics as u16),
            Ok(hex!("2402 03").to_vec())
        );
        assert_eq!(
            read(h, &filtered, Attributes::CommissionedFabrics as u16),
            Ok(hex!("2402 02").to_vec())
        );
        assert_eq!(
            read(h, &filtered, Attributes::CurrentFabricIndex as u16),
            Ok(vec![0x24, 0x02, a.get()])
        );
        assert_eq!(
            read(h, &filtered, GlobalAttributes::ClusterRevision as u16),
            Ok(hex!("2502 0100").to_vec())
        );
        assert_eq!(read(h, &filtered, 0x00FF), Err(ImStatus::UnsupportedAttribute));
    });
}
