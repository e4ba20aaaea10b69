//! Disabled capture behaves as a silent no-op

use crate::common::*;

#[test]
fn null_store_is_inert_under_any_sequence() {
    let engine = MemoryEngine::new();
    let store = NullBeforeImageRecordStore;
    for round in 0..3u64 {
        let txn = engine.begin_txn();
        for raw in [1u64, 1, 2, round] {
            let put = store
                .put(&txn, Lsn::new(raw), b"x", TtlDescriptor::hours(1), CaptureCause::Delete)
                .unwrap();
            assert!(!put);
            assert_eq!(store.get(Lsn::new(raw), Some(&txn)).unwrap(), None);
        }
        txn.commit().unwrap();
        store.close().unwrap();
    }
    assert!(store.stats(true).is_zero());
    assert!(store.stats(false).is_zero());
}

#[test]
fn disabled_coordinator_ships_no_images() {
    let h = Harness::disabled();
    assert!(!h.coordinator.store().is_enabled());
    let lsn = h.committed_update(b"k", 100, b"old", b"new");

    let entry = h.coordinator.log().read(lsn).unwrap().unwrap().decode_mutation().unwrap();
    assert!(entry.before_image_ttl().is_none());

    let mut feeder = h.coordinator.feeder(CURRENT_LOG_VERSION).unwrap();
    let shipped = feeder.poll(&mut Vec::new()).unwrap();
    assert_eq!(shipped.len(), 1);
    assert!(shipped[0].before_image().is_none());
    assert!(h.coordinator.stats(false).is_zero());
    assert!(!h.engine.has_store(strata_beforeimage::DEFAULT_STORE_NAME));
    h.coordinator.close().unwrap();
    h.coordinator.close().unwrap();
}
