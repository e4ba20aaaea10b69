//! A before-image is captured at most once per LSN

use crate::common::*;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn second_capture_is_fatal_and_keeps_first() {
    let h = Harness::enabled(TtlDescriptor::days(1));
    let store = h.coordinator.store();

    let txn = h.engine.begin_txn();
    store
        .put(
            &txn,
            Lsn::new(100),
            &payload_bytes(b"first"),
            TtlDescriptor::days(1),
            CaptureCause::Update,
        )
        .unwrap();
    txn.commit().unwrap();

    let txn = h.engine.begin_txn();
    let err = store
        .put(
            &txn,
            Lsn::new(100),
            &payload_bytes(b"second"),
            TtlDescriptor::days(1),
            CaptureCause::Update,
        )
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateBeforeImage { lsn } if lsn == Lsn::new(100)));
    assert!(err.is_fatal());
    txn.commit().unwrap();

    assert_eq!(
        store.get(Lsn::new(100), None).unwrap(),
        Some(payload_bytes(b"first"))
    );
    assert_eq!(store.stats(false).records, 1);
}

#[test]
fn concurrent_captures_of_one_lsn_admit_one() {
    let h = Harness::enabled(TtlDescriptor::days(1));
    let store = Arc::clone(h.coordinator.store());
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let store = Arc::clone(&store);
            let engine = Arc::clone(&h.engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let txn = engine.begin_txn();
                barrier.wait();
                let outcome = store.put(
                    &txn,
                    Lsn::new(7),
                    &payload_bytes(&[i as u8]),
                    TtlDescriptor::days(1),
                    CaptureCause::Delete,
                );
                txn.commit().unwrap();
                outcome
            })
        })
        .collect();

    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = outcomes.iter().filter(|o| matches!(o, Ok(true))).count();
    let duplicates = outcomes
        .iter()
        .filter(|o| matches!(o, Err(Error::DuplicateBeforeImage { .. })))
        .count();
    assert_eq!(winners, 1);
    assert_eq!(duplicates, threads - 1);
    assert_eq!(h.engine.open_calls(), 1);
    assert_eq!(store.stats(false).records, 1);
}

#[test]
fn get_before_any_capture_is_fatal() {
    let h = Harness::enabled(TtlDescriptor::days(1));
    let err = h.coordinator.store().get(Lsn::new(1), None).unwrap_err();
    assert!(matches!(err, Error::StoreNotCreated));
    assert!(err.is_fatal());
}
