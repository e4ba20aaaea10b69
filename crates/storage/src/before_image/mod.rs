//! Before-image capture
//!
//! When a record is updated, deleted or tombstoned, its prior value is
//! captured into an internal, TTL-governed store keyed by the LSN of the
//! superseded version (the `abort_lsn`). Change-capture consumers read it
//! back through replication; normal reads never see it.
//!
//! # Components
//!
//! - `BeforeImagePayload`: the durable value format
//! - `BeforeImageStore`: capability interface, with `BeforeImageRecordStore`
//!   (enabled) and `NullBeforeImageRecordStore` (disabled)
//! - `BeforeImageEntryCache`: optional bounded FIFO read accelerator
//! - `BeforeImageStats`: lifetime counters
//! - `CaptureHook`: injected test seam run before each capture

mod cache;
mod hook;
mod null;
mod payload;
mod stats;
mod store;

pub use cache::BeforeImageEntryCache;
pub use hook::CaptureHook;
pub use null::NullBeforeImageRecordStore;
pub use payload::{BeforeImagePayload, BeforeImagePayloadBuilder};
pub use stats::BeforeImageStats;
pub use store::{BeforeImageRecordStore, CachedImage, DEFAULT_STORE_NAME};

use std::fmt::{self, Debug};

use serde::{Deserialize, Serialize};
use strata_core::{ExpirationToken, Lsn, Result, TtlDescriptor};

use crate::txn::TxnContext;

/// Mutation that superseded the captured version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureCause {
    /// Value replaced
    Update,
    /// Record deleted
    Delete,
    /// Logical delete that still replicates
    Tombstone,
}

impl fmt::Display for CaptureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureCause::Update => write!(f, "update"),
            CaptureCause::Delete => write!(f, "delete"),
            CaptureCause::Tombstone => write!(f, "tombstone"),
        }
    }
}

/// Before-image store capability
///
/// Selected once when the engine starts; callers never branch on whether
/// the feature is enabled.
pub trait BeforeImageStore: Send + Sync + Debug {
    /// False for the disabled implementation
    fn is_enabled(&self) -> bool;

    /// Capture `data` under `abort_lsn` inside `txn`
    ///
    /// Returns `Ok(true)` when captured and `Ok(false)` when the feature is
    /// disabled. Capturing the same LSN twice is `Error::DuplicateBeforeImage`.
    fn put(
        &self,
        txn: &TxnContext,
        abort_lsn: Lsn,
        data: &[u8],
        ttl: TtlDescriptor,
        cause: CaptureCause,
    ) -> Result<bool>;

    /// Capture `data` with an expiration already derived from the TTL
    ///
    /// Lets a caller stamp the stored record and the log entry from the
    /// same instant. Otherwise behaves like `put`.
    fn put_expiring(
        &self,
        txn: &TxnContext,
        abort_lsn: Lsn,
        data: &[u8],
        expiration: ExpirationToken,
        cause: CaptureCause,
    ) -> Result<bool>;

    /// Captured bytes for `abort_lsn`, or `None` when absent or expired
    ///
    /// Without a `txn` the lookup runs in its own auto-commit scope.
    fn get(&self, abort_lsn: Lsn, txn: Option<&TxnContext>) -> Result<Option<Vec<u8>>>;

    /// Release the backing store; idempotent
    fn close(&self) -> Result<()>;

    /// Counter snapshot, optionally resetting the counters
    fn stats(&self, clear: bool) -> BeforeImageStats;
}
