//! Lock/transaction scope supplied by the storage engine
//!
//! A `TxnContext` groups writes that must become durable together. Writes
//! are visible to their own context immediately, to every other context
//! after `commit()`, and are undone by `abort()`. A before-image capture
//! runs inside the same context as the primary mutation it accompanies, so
//! either both survive or neither does.
//!
//! Local contexts are the auto-commit flavour: created around a single
//! operation and closed (committed) right after it.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use strata_core::{Error, Result};

/// Something that holds per-key transactional state
///
/// Internal stores register themselves for every key they write so the
/// context can finish or undo the write.
pub trait TxnParticipant: Send + Sync {
    /// Make `key` written by `txn_id` visible to everyone
    fn commit_key(&self, txn_id: u64, key: &[u8]);

    /// Undo the write of `key` by `txn_id`
    fn abort_key(&self, txn_id: u64, key: &[u8]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxnState {
    Open,
    Committed,
    Aborted,
}

/// Lock/transaction scope
pub struct TxnContext {
    id: u64,
    local: bool,
    state: Mutex<TxnState>,
    writes: Mutex<Vec<(Arc<dyn TxnParticipant>, Vec<u8>)>>,
}

impl TxnContext {
    /// Explicit transaction; the caller commits or aborts
    pub fn explicit(id: u64) -> Self {
        Self::with_kind(id, false)
    }

    /// Auto-committing scope closed around a single operation
    pub fn local(id: u64) -> Self {
        Self::with_kind(id, true)
    }

    fn with_kind(id: u64, local: bool) -> Self {
        TxnContext {
            id,
            local,
            state: Mutex::new(TxnState::Open),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Transaction id
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// True for auto-commit scopes
    #[inline]
    pub fn is_local(&self) -> bool {
        self.local
    }

    /// True until commit or abort
    pub fn is_open(&self) -> bool {
        *self.state.lock() == TxnState::Open
    }

    /// Fail unless the context still accepts operations
    pub fn check_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(Error::corruption(format!(
                "transaction {} used after it finished",
                self.id
            )))
        }
    }

    /// Record a write so commit/abort can reach it
    pub fn register_write(&self, participant: Arc<dyn TxnParticipant>, key: Vec<u8>) {
        self.writes.lock().push((participant, key));
    }

    /// Number of writes performed in this context
    pub fn write_count(&self) -> usize {
        self.writes.lock().len()
    }

    /// Make every write visible
    pub fn commit(&self) -> Result<()> {
        self.finish(TxnState::Committed)
    }

    /// Undo every write
    pub fn abort(&self) -> Result<()> {
        self.finish(TxnState::Aborted)
    }

    /// Close a local scope (commits its writes)
    pub fn close(&self) -> Result<()> {
        if self.is_open() {
            self.commit()
        } else {
            Ok(())
        }
    }

    fn finish(&self, outcome: TxnState) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state != TxnState::Open {
                return Err(Error::corruption(format!(
                    "transaction {} already {:?}",
                    self.id, *state
                )));
            }
            *state = outcome;
        }
        let writes = std::mem::take(&mut *self.writes.lock());
        for (participant, key) in writes {
            match outcome {
                TxnState::Committed => participant.commit_key(self.id, &key),
                _ => participant.abort_key(self.id, &key),
            }
        }
        Ok(())
    }
}

impl Drop for TxnContext {
    fn drop(&mut self) {
        if self.is_open() && self.write_count() > 0 {
            warn!(txn_id = self.id, "transaction dropped while open, aborting");
            let _ = self.abort();
        }
    }
}

impl fmt::Debug for TxnContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxnContext")
            .field("id", &self.id)
            .field("local", &self.local)
            .field("state", &*self.state.lock())
            .field("writes", &self.write_count())
            .finish()
    }
}
