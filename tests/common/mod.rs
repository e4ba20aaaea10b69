//! Shared test utilities for the integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::sync::{Arc, Once};
use std::time::Duration;

pub use strata_beforeimage::{
    BeforeImageConfig, BeforeImagePayload, BeforeImageRecordStore, BeforeImageStore,
    CaptureCause, CaptureCoordinator, Clock, Error, LogBuffer, LogEntryType, LogItem, Lsn,
    ManualClock, MemoryEngine, NullBeforeImageRecordStore, PriorVersion, ReplicationWireRecord,
    StorageEngine, Timestamp, TtlDescriptor, BEFORE_IMAGE_LOG_VERSION, CURRENT_LOG_VERSION,
};

pub const HOUR: Duration = Duration::from_secs(3_600);

/// Start of every test clock: a whole number of days after the epoch
pub const START: Timestamp = Timestamp::from_secs(86_400 * 20_000);

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output to the test harness
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

// ============================================================================
// Harness - engine, clock, log and coordinator
// ============================================================================

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub engine: Arc<MemoryEngine>,
    pub coordinator: CaptureCoordinator,
}

impl Harness {
    pub fn new(config: BeforeImageConfig) -> Self {
        init_tracing();
        let clock = Arc::new(ManualClock::new(START));
        let engine = Arc::new(MemoryEngine::with_clock(clock.clone()));
        let coordinator =
            CaptureCoordinator::new(engine.clone(), Arc::new(LogBuffer::new()), config).unwrap();
        Harness {
            clock,
            engine,
            coordinator,
        }
    }

    pub fn enabled(ttl: TtlDescriptor) -> Self {
        Self::new(BeforeImageConfig::enabled_with_ttl(ttl))
    }

    pub fn disabled() -> Self {
        Self::new(BeforeImageConfig::default())
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    /// Committed update of `key` superseding `prior_lsn`; returns the update's LSN
    pub fn committed_update(&self, key: &[u8], prior_lsn: u64, old: &[u8], new: &[u8]) -> Lsn {
        let txn = self.coordinator.begin();
        let prior = PriorVersion::new(Lsn::new(prior_lsn), old.to_vec(), START);
        let lsn = self.coordinator.update(&txn, 1, key, new, &prior).unwrap();
        self.coordinator.commit(&txn).unwrap();
        lsn
    }

    /// Fresh log item for `lsn`, without a memo
    pub fn log_item(&self, lsn: Lsn) -> LogItem {
        LogItem::new(self.coordinator.log().read(lsn).unwrap().unwrap())
    }

    /// Resolve a wire record with the coordinator's store and the test clock
    pub fn resolve(&self, item: &mut LogItem) -> ReplicationWireRecord {
        ReplicationWireRecord::new(item, self.coordinator.store().as_ref(), self.clock.as_ref())
            .unwrap()
    }
}

/// Payload bytes wrapping `image`, as the coordinator stores them
pub fn payload_bytes(image: &[u8]) -> Vec<u8> {
    BeforeImagePayload::builder()
        .image(image.to_vec())
        .modification_time(START)
        .build()
        .marshal()
}
