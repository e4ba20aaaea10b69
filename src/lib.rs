//! Strata before-image capture
//!
//! Captures the prior value of every updated, deleted or tombstoned record
//! into a TTL-governed internal store keyed by the LSN of the superseded
//! version, and ships it to replicas alongside the mutation until it
//! expires.
//!
//! # Quick Start
//!
//! ```ignore
//! use strata_beforeimage::{BeforeImageConfig, CaptureCoordinator, LogBuffer, MemoryEngine};
//!
//! let coordinator = CaptureCoordinator::new(
//!     Arc::new(MemoryEngine::new()),
//!     Arc::new(LogBuffer::new()),
//!     BeforeImageConfig::enabled_with_ttl(TtlDescriptor::days(1)),
//! )?;
//! let txn = coordinator.begin();
//! coordinator.update(&txn, db_id, b"key", b"new", &prior)?;
//! coordinator.commit(&txn)?;
//! ```
//!
//! # Architecture
//!
//! - `strata-core`: time, LSNs, TTLs, packed codec, errors
//! - `strata-storage`: engine collaborator and the before-image stores
//! - `strata-durability`: log entry formats and the log
//! - `strata-wire`: replication wire records
//! - `strata-engine`: config, capture coordination, feeder

pub use strata_core::{
    Clock, Error, ExpirationToken, Lsn, ManualClock, Result, SystemClock, TimeUnit, Timestamp,
    TtlDescriptor, BEFORE_IMAGE_LOG_VERSION, CURRENT_LOG_VERSION, MIN_LOG_VERSION,
};
pub use strata_durability::{
    LogBuffer, LogEntryHeader, LogEntryType, MutationLogEntry, UtilizationReport,
    UtilizationScanner, VersionedMutationLogEntry, BEFORE_IMAGE_DB_ID,
};
pub use strata_engine::{BeforeImageConfig, CaptureCoordinator, Feeder, PriorVersion};
pub use strata_storage::{
    BeforeImageEntryCache, BeforeImagePayload, BeforeImageRecordStore, BeforeImageStats,
    BeforeImageStore, CaptureCause, CaptureHook, MemoryEngine, NullBeforeImageRecordStore,
    StorageEngine, TxnContext, DEFAULT_STORE_NAME,
};
pub use strata_wire::{LogItem, ReplicationWireRecord};
