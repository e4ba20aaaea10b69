//! Lifetime capture counters
//!
//! Counters only grow; expiration of a captured image does not decrement
//! them. `snapshot(true)` is the only way to reset.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::CaptureCause;

/// Point-in-time copy of the capture counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BeforeImageStats {
    /// Before-images captured
    pub records: u64,
    /// Payload bytes stored
    pub bytes: u64,
    /// Captures caused by updates
    pub by_update: u64,
    /// Captures caused by deletes
    pub by_delete: u64,
    /// Captures caused by tombstones
    pub by_tombstone: u64,
}

impl BeforeImageStats {
    /// Count for a single cause
    pub fn by_cause(&self, cause: CaptureCause) -> u64 {
        match cause {
            CaptureCause::Update => self.by_update,
            CaptureCause::Delete => self.by_delete,
            CaptureCause::Tombstone => self.by_tombstone,
        }
    }

    /// True when nothing has been captured
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// Atomic counters behind `BeforeImageStats`
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    records: AtomicU64,
    bytes: AtomicU64,
    by_update: AtomicU64,
    by_delete: AtomicU64,
    by_tombstone: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record(&self, cause: CaptureCause, bytes: usize) {
        self.records.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes as u64, Ordering::Relaxed);
        let by_cause = match cause {
            CaptureCause::Update => &self.by_update,
            CaptureCause::Delete => &self.by_delete,
            CaptureCause::Tombstone => &self.by_tombstone,
        };
        by_cause.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, clear: bool) -> BeforeImageStats {
        let read = |c: &AtomicU64| {
            if clear {
                c.swap(0, Ordering::Relaxed)
            } else {
                c.load(Ordering::Relaxed)
            }
        };
        BeforeImageStats {
            records: read(&self.records),
            bytes: read(&self.bytes),
            by_update: read(&self.by_update),
            by_delete: read(&self.by_delete),
            by_tombstone: read(&self.by_tombstone),
        }
    }
}
