//! Offline before-image utilization scanner
//!
//! Walks a log, keeps the insertion entries written to the before-image
//! store (`db_id == BEFORE_IMAGE_DB_ID`) and splits them by the record
//! expiration into obsolete (expired) and active. Read-only.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use strata_core::{Clock, Result};

use crate::entry_type::LogEntryType;
use crate::log_buffer::LogBuffer;
use crate::mutation::BEFORE_IMAGE_DB_ID;

/// Aggregate before-image utilization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UtilizationReport {
    /// Log items visited
    pub items_scanned: u64,
    /// Before-image insertions still live
    pub active_entries: u64,
    /// Framed log bytes of live insertions
    pub active_bytes: u64,
    /// Before-image insertions past their expiration
    pub obsolete_entries: u64,
    /// Framed log bytes of expired insertions
    pub obsolete_bytes: u64,
}

impl UtilizationReport {
    /// Before-image insertions seen
    pub fn total_entries(&self) -> u64 {
        self.active_entries + self.obsolete_entries
    }

    /// Percentage of before-image bytes still live
    pub fn utilization_percent(&self) -> f64 {
        let total = self.active_bytes + self.obsolete_bytes;
        if total == 0 {
            100.0
        } else {
            self.active_bytes as f64 * 100.0 / total as f64
        }
    }
}

/// Scans a log for before-image insertions
#[derive(Debug)]
pub struct UtilizationScanner {
    db_id: u64,
    clock: Arc<dyn Clock>,
}

impl UtilizationScanner {
    /// Scanner for the default before-image db id
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::for_db(BEFORE_IMAGE_DB_ID, clock)
    }

    /// Scanner for another internal db id
    pub fn for_db(db_id: u64, clock: Arc<dyn Clock>) -> Self {
        UtilizationScanner { db_id, clock }
    }

    /// Scan every item of `log`
    pub fn scan(&self, log: &LogBuffer) -> Result<UtilizationReport> {
        let now = self.clock.now();
        let mut report = UtilizationReport::default();
        for item in log.items()? {
            report.items_scanned += 1;
            if item.header.entry_type != u8::from(LogEntryType::Insert) {
                continue;
            }
            let entry = item.decode_mutation()?;
            if entry.base().db_id != self.db_id {
                continue;
            }
            let bytes = item.framed_len() as u64;
            if entry.base().expiration.is_expired(now) {
                report.obsolete_entries += 1;
                report.obsolete_bytes += bytes;
            } else {
                report.active_entries += 1;
                report.active_bytes += bytes;
            }
        }
        info!(
            items = report.items_scanned,
            active = report.active_entries,
            active_bytes = report.active_bytes,
            obsolete = report.obsolete_entries,
            obsolete_bytes = report.obsolete_bytes,
            "before-image utilization scan complete"
        );
        Ok(report)
    }
}
