mod common;

use core::time::Duration;

use matter_opcreds::{
    acl::AccessControl,
    cluster::utility::{
        basic_information,
        node_operational_cred::{Attributes, UpdateNocRequest},
    },
    config::DeviceConfig,
    exchange::Exchange,
    fabric::PendingKey,
    group_keys::GroupDataProvider,
};

use common::*;

#[test]
fn test_expiry_deletes_added_fabric() {
    with_harness(DeviceConfig::default(), |h| {
        let commissioner = Commissioner::new(1, 0xFAB1);
        let mut exchange = h.exchange(h.pase());
        h.arm(&mut exchange);
        let fabric = h
            .add_noc(&mut exchange, &commissioner, 0x1122)
            .fabric_index
            .unwrap();
        let case = h.case(fabric, ADMIN_SUBJECT);
        h.reporter.drain();

        advance(Duration::from_secs(59));
        h.commissioning.poll();
        assert!(h.failsafe.borrow().is_armed());
        assert_eq!(
            h.commissioning.fail_safe_deadline(),
            Some(Duration::from_secs(1))
        );

        advance(Duration::from_secs(1));
        h.commissioning.poll();
        assert!(!h.failsafe.borrow().is_armed());
        assert_eq!(h.commissioning.fail_safe_deadline(), None);
        assert_eq!(h.noc.commissioned_fabrics(), 0);
        assert!(h.noc.trusted_root_certificates().is_empty());
        assert!(!h.sessions.borrow().is_active(case));
        assert_eq!(h.sessions.borrow().count_for_fabric(fabric), 0);
        assert!(h.acl.borrow().entries(fabric).is_empty());
        assert!(h.groups.borrow().key_set_ids(fabric).is_empty());
        assert!(h.advertiser.instances().is_empty());
        assert_eq!(h.commissioning.breadcrumb(), 0);
        {
            let fabrics = h.fabrics.borrow();
            assert!(!fabrics.has_pending_fabric());
            assert!(!fabrics.has_pending_root_cert());
        }

        let delivered = h.events.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].fabric, fabric);
        assert_eq!(delivered[0].event, basic_information::Events::Leave as u32);
        assert_eq!(
            h.reporter.drain(),
            Some(vec![
                Attributes::Fabrics.path(),
                Attributes::CommissionedFabrics.path()
            ])
        );
    });
}

#[test]
fn test_expiry_keeps_committed_fabrics() {
    with_harness(DeviceConfig::default(), |h| {
        let first = Commissioner::new(1, 0xFAB1);
        let second = Commissioner::new(2, 0xFAB2);
        let (existing, case) = h.commission(&first, 0x1122);

        // An administrator of the existing fabric adds another one
        let mut exchange = h.exchange(case);
        h.arm(&mut exchange);
        let added = h
            .add_noc(&mut exchange, &second, 0x5566)
            .fabric_index
            .unwrap();
        assert_ne!(added, existing);
        assert_eq!(exchange.session().fabric_index, Some(existing));
        assert_eq!(h.noc.commissioned_fabrics(), 2);
        assert_eq!(h.noc.trusted_root_certificates().len(), 2);

        h.commissioning.on_fail_safe_timer_expired();
        assert_eq!(h.noc.commissioned_fabrics(), 1);
        assert!(h.fabrics.borrow().find(existing).is_some());
        assert_eq!(
            h.noc.trusted_root_certificates(),
            vec![first.root.cert().to_vec()]
        );
        assert!(h.sessions.borrow().is_active(case));
        assert_eq!(h.acl.borrow().entries(existing).len(), 1);
        assert!(h.acl.borrow().entries(added).is_empty());
        assert_eq!(h.advertiser.instances().len(), 1);
    });
}

#[test]
fn test_expiry_reverts_update() {
    with_harness(DeviceConfig::default(), |h| {
        let commissioner = Commissioner::new(1, 0xFAB1);
        let (fabric, case) = h.commission(&commissioner, 0x1122);
        let mut exchange = h.exchange(case);
        h.arm(&mut exchange);
        let csr = h.csr(&mut exchange, true);
        let noc = commissioner.noc_for(&csr, 0x3344);
        assert!(h
            .noc
            .update_noc(&mut exchange, &UpdateNocRequest { noc: &noc, icac: None })
            .unwrap()
            .is_ok());
        assert_eq!(h.fabrics.borrow().find(fabric).unwrap().node_id(), 0x3344);
        h.reporter.drain();

        advance(Duration::from_secs(61));
        h.commissioning.poll();
        assert_eq!(h.fabrics.borrow().find(fabric).unwrap().node_id(), 0x1122);
        assert!(!h.fabrics.borrow().has_pending_fabric());
        // Sessions may have been set up with the reverted credentials
        assert!(!h.sessions.borrow().is_active(case));
        assert_eq!(h.noc.commissioned_fabrics(), 1);
        assert_eq!(h.acl.borrow().entries(fabric).len(), 1);
        assert_eq!(
            h.reporter.drain(),
            Some(vec![
                Attributes::Fabrics.path(),
                Attributes::CommissionedFabrics.path()
            ])
        );
    });
}

#[test]
fn test_arm_zero_disarms_and_cleans_up() {
    with_harness(DeviceConfig::default(), |h| {
        let commissioner = Commissioner::new(1, 0xFAB1);
        let mut exchange = h.exchange(h.pase());
        h.arm(&mut exchange);
        h.noc
            .add_trusted_root_certificate(&mut exchange, commissioner.root.cert())
            .unwrap();
        h.csr(&mut exchange, false);

        let response = h.commissioning.arm_fail_safe(&mut exchange, 0, 5);
        assert!(response.is_ok());
        assert!(!h.failsafe.borrow().is_armed());
        assert_eq!(h.commissioning.breadcrumb(), 5);
        let fabrics = h.fabrics.borrow();
        assert!(!fabrics.has_pending_root_cert());
        assert_eq!(fabrics.pending_operational_key(), PendingKey::None);
    });
}

#[test]
fn test_rearm_extends_deadline() {
    with_harness(DeviceConfig::default(), |h| {
        let mut exchange = h.exchange(h.pase());
        h.arm(&mut exchange);
        advance(Duration::from_secs(30));
        assert_eq!(
            h.commissioning.fail_safe_deadline(),
            Some(Duration::from_secs(30))
        );
        h.arm(&mut exchange);
        assert_eq!(
            h.commissioning.fail_safe_deadline(),
            Some(Duration::from_secs(60))
        );
        advance(Duration::from_secs(45));
        h.commissioning.poll();
        assert!(h.failsafe.borrow().is_armed());
    });
}
