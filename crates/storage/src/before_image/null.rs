//! Disabled before-image store

use strata_core::{ExpirationToken, Lsn, Result, TtlDescriptor};

use super::{BeforeImageStats, BeforeImageStore, CaptureCause};
use crate::txn::TxnContext;

/// Before-image store used when the feature is off
///
/// Captures nothing and finds nothing. Never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBeforeImageRecordStore;

impl BeforeImageStore for NullBeforeImageRecordStore {
    fn is_enabled(&self) -> bool {
        false
    }

    fn put(
        &self,
        _txn: &TxnContext,
        _abort_lsn: Lsn,
        _data: &[u8],
        _ttl: TtlDescriptor,
        _cause: CaptureCause,
    ) -> Result<bool> {
        Ok(false)
    }

    fn put_expiring(
        &self,
        _txn: &TxnContext,
        _abort_lsn: Lsn,
        _data: &[u8],
        _expiration: ExpirationToken,
        _cause: CaptureCause,
    ) -> Result<bool> {
        Ok(false)
    }

    fn get(&self, _abort_lsn: Lsn, _txn: Option<&TxnContext>) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }

    fn stats(&self, _clear: bool) -> BeforeImageStats {
        BeforeImageStats::default()
    }
}
