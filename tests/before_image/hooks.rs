//! Injected capture hook

use crate::common::*;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use strata_beforeimage::{CaptureHook, Result};

#[derive(Debug, Default)]
struct FailNth {
    fail_at: usize,
    calls: AtomicUsize,
    seen: Mutex<Vec<(Lsn, CaptureCause)>>,
}

impl CaptureHook for FailNth {
    fn before_put(&self, abort_lsn: Lsn, cause: CaptureCause) -> Result<()> {
        self.seen.lock().push((abort_lsn, cause));
        if self.calls.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_at {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "injected capture failure",
            )));
        }
        Ok(())
    }
}

fn coordinator_with(hook: Arc<FailNth>) -> (Arc<MemoryEngine>, CaptureCoordinator) {
    init_tracing();
    let engine = Arc::new(MemoryEngine::with_clock(Arc::new(ManualClock::new(START))));
    let store = BeforeImageRecordStore::new(engine.clone()).with_hook(hook);
    let coordinator = CaptureCoordinator::with_store(
        engine.clone(),
        Arc::new(LogBuffer::new()),
        BeforeImageConfig::enabled_with_ttl(TtlDescriptor::days(1)),
        Arc::new(store),
    )
    .unwrap();
    (engine, coordinator)
}

#[test]
fn hook_sees_every_capture() {
    let hook = Arc::new(FailNth::default());
    let (_, c) = coordinator_with(hook.clone());
    let txn = c.begin();
    c.update(&txn, 1, b"a", b"v", &PriorVersion::new(Lsn::new(4), b"x".to_vec(), START))
        .unwrap();
    c.insert(&txn, 1, b"b", b"v").unwrap();
    c.tombstone(&txn, 1, b"a", &PriorVersion::new(Lsn::new(8), b"v".to_vec(), START))
        .unwrap();
    c.commit(&txn).unwrap();

    assert_eq!(
        hook.seen.lock().as_slice(),
        &[(Lsn::new(4), CaptureCause::Update), (Lsn::new(8), CaptureCause::Tombstone)]
    );
}

#[test]
fn failed_capture_fails_the_mutation() {
    let hook = Arc::new(FailNth {
        fail_at: 2,
        ..FailNth::default()
    });
    let (_, c) = coordinator_with(hook);
    let txn = c.begin();
    c.update(&txn, 1, b"a", b"v", &PriorVersion::new(Lsn::new(4), b"x".to_vec(), START))
        .unwrap();
    let logged = c.log().len();

    let err = c
        .delete(&txn, 1, b"b", &PriorVersion::new(Lsn::new(5), b"y".to_vec(), START))
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert!(!err.is_fatal());
    assert_eq!(c.log().len(), logged);
    assert_eq!(c.stats(false).records, 1);

    c.abort(&txn).unwrap();
    assert!(c.store().get(Lsn::new(4), None).unwrap().is_none());
}
