//! Storage-engine collaborator interface
//!
//! The before-image subsystem never implements durability itself. It asks
//! the engine for an internal store (create-or-open), for transaction
//! scopes, and for the clock used to stamp TTLs. `MemoryEngine` is the
//! in-process implementation used by the engine crate and by tests.

use std::fmt::Debug;
use std::sync::Arc;

use strata_core::{Clock, ExpirationToken, Result};

use crate::stored_value::StoredValue;
use crate::txn::TxnContext;

/// Result of a no-overwrite put
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The key was absent and is now written
    Inserted,
    /// The key already exists; nothing was written
    KeyExists,
}

/// Handle to an internal (system) store owned by the engine
///
/// All methods run inside the caller's transaction scope. Expired records
/// are invisible to every read.
pub trait InternalStore: Send + Sync + Debug {
    /// Store name
    fn name(&self) -> &str;

    /// Engine-assigned store id
    fn id(&self) -> u64;

    /// Insert `(key, value)` unless the key is present
    fn put_no_overwrite(
        &self,
        txn: &TxnContext,
        key: &[u8],
        value: &[u8],
        expiration: ExpirationToken,
    ) -> Result<PutOutcome>;

    /// Read a record visible to `txn`
    fn get(&self, txn: &TxnContext, key: &[u8]) -> Result<Option<StoredValue>>;

    /// Every record visible to `txn`, in key order
    fn scan(&self, txn: &TxnContext) -> Result<Vec<(Vec<u8>, StoredValue)>>;

    /// Release this handle; idempotent
    fn close(&self) -> Result<()>;
}

/// Primitives the storage engine exposes to subsystems
pub trait StorageEngine: Send + Sync + Debug {
    /// Create the named internal store, or open it if it exists
    fn open_internal_store(&self, name: &str) -> Result<Arc<dyn InternalStore>>;

    /// Start an explicit transaction
    fn begin_txn(&self) -> TxnContext;

    /// Start an auto-commit scope
    fn local_txn(&self) -> TxnContext;

    /// Clock used for TTL computation and expiration checks
    fn clock(&self) -> Arc<dyn Clock>;
}
