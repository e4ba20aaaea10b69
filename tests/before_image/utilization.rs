//! Utilization scanning over a coordinator's log

use crate::common::*;
use std::sync::Arc;
use strata_beforeimage::UtilizationScanner;

#[test]
fn captures_turn_obsolete_after_ttl() {
    let h = Harness::enabled(TtlDescriptor::hours(2));
    h.committed_update(b"a", 10, b"a0", b"a1");
    h.committed_update(b"b", 11, b"b0", b"b1");

    let scanner = UtilizationScanner::new(h.clock.clone());
    let fresh = scanner.scan(h.coordinator.log()).unwrap();
    // per update: capture insert, update, commit marker
    assert_eq!(fresh.items_scanned, 6);
    assert_eq!(fresh.active_entries, 2);
    assert_eq!(fresh.obsolete_entries, 0);
    assert_eq!(fresh.utilization_percent(), 100.0);

    h.advance(HOUR);
    h.committed_update(b"c", 12, b"c0", b"c1");
    h.advance(HOUR);

    let later = scanner.scan(h.coordinator.log()).unwrap();
    assert_eq!(later.total_entries(), 3);
    assert_eq!(later.active_entries, 1);
    assert_eq!(later.obsolete_entries, 2);
    assert!(later.utilization_percent() < 50.0);
}

#[test]
fn user_inserts_are_not_counted() {
    let h = Harness::enabled(TtlDescriptor::days(1));
    let txn = h.coordinator.begin();
    h.coordinator.insert(&txn, 1, b"k", b"v").unwrap();
    h.coordinator.commit(&txn).unwrap();

    let report = UtilizationScanner::new(Arc::clone(&h.clock) as Arc<dyn Clock>)
        .scan(h.coordinator.log())
        .unwrap();
    assert_eq!(report.items_scanned, 2);
    assert_eq!(report.total_entries(), 0);
}

#[test]
fn disabled_capture_leaves_nothing_to_scan() {
    let h = Harness::disabled();
    h.committed_update(b"a", 10, b"a0", b"a1");
    let report = UtilizationScanner::new(h.clock.clone())
        .scan(h.coordinator.log())
        .unwrap();
    assert_eq!(report.total_entries(), 0);
    assert_eq!(report.items_scanned, 2);
}
