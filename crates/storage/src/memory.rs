//! MemoryEngine: in-process storage engine with BTreeMap stores
//!
//! Each internal store is a `BTreeMap<Vec<u8>, StoredValue>` behind a
//! `parking_lot::RwLock`, so scans come back in key order. Expiration is
//! logical: expired records are filtered at read time and may be replaced
//! by a later insert, they are never deleted eagerly.
//!
//! Store data outlives handles. `open_internal_store` on an existing name
//! returns a fresh handle over the same data; closing a handle only stops
//! that handle.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tracing::debug;

use strata_core::{Clock, Error, ExpirationToken, Result, SystemClock};

use crate::engine::{InternalStore, PutOutcome, StorageEngine};
use crate::stored_value::StoredValue;
use crate::txn::{TxnContext, TxnParticipant};

/// Records of one internal store, shared by all its handles
#[derive(Debug)]
struct StoreData {
    id: u64,
    name: String,
    records: RwLock<BTreeMap<Vec<u8>, StoredValue>>,
}

impl TxnParticipant for StoreData {
    fn commit_key(&self, txn_id: u64, key: &[u8]) {
        if let Some(record) = self.records.write().get_mut(key) {
            if record.writer() == Some(txn_id) {
                record.commit();
            }
        }
    }

    fn abort_key(&self, txn_id: u64, key: &[u8]) {
        let mut records = self.records.write();
        if records.get(key).and_then(|r| r.writer()) == Some(txn_id) {
            records.remove(key);
        }
    }
}

/// In-process storage engine
#[derive(Debug)]
pub struct MemoryEngine {
    stores: Mutex<FxHashMap<String, Arc<StoreData>>>,
    next_store_id: AtomicU64,
    next_txn_id: AtomicU64,
    open_calls: AtomicUsize,
    clock: Arc<dyn Clock>,
}

impl MemoryEngine {
    /// Engine on the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Engine on an injected clock
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            stores: Mutex::new(FxHashMap::default()),
            next_store_id: AtomicU64::new(1),
            next_txn_id: AtomicU64::new(1),
            open_calls: AtomicUsize::new(0),
            clock,
        }
    }

    /// Number of `open_internal_store` calls served
    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    /// Whether a store with this name has been created
    pub fn has_store(&self, name: &str) -> bool {
        self.stores.lock().contains_key(name)
    }

    fn next_txn_id(&self) -> u64 {
        self.next_txn_id.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine for MemoryEngine {
    fn open_internal_store(&self, name: &str) -> Result<Arc<dyn InternalStore>> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        let data = {
            let mut stores = self.stores.lock();
            stores
                .entry(name.to_string())
                .or_insert_with(|| {
                    let id = self.next_store_id.fetch_add(1, Ordering::SeqCst);
                    debug!(store = name, id, "created internal store");
                    Arc::new(StoreData {
                        id,
                        name: name.to_string(),
                        records: RwLock::new(BTreeMap::new()),
                    })
                })
                .clone()
        };
        Ok(Arc::new(MemoryStore {
            data,
            clock: Arc::clone(&self.clock),
            closed: AtomicBool::new(false),
        }))
    }

    fn begin_txn(&self) -> TxnContext {
        TxnContext::explicit(self.next_txn_id())
    }

    fn local_txn(&self) -> TxnContext {
        TxnContext::local(self.next_txn_id())
    }

    fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }
}

/// Handle to one internal store of a `MemoryEngine`
#[derive(Debug)]
pub struct MemoryStore {
    data: Arc<StoreData>,
    clock: Arc<dyn Clock>,
    closed: AtomicBool,
}

impl MemoryStore {
    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(Error::StoreClosed)
        } else {
            Ok(())
        }
    }
}

impl InternalStore for MemoryStore {
    fn name(&self) -> &str {
        &self.data.name
    }

    fn id(&self) -> u64 {
        self.data.id
    }

    fn put_no_overwrite(
        &self,
        txn: &TxnContext,
        key: &[u8],
        value: &[u8],
        expiration: ExpirationToken,
    ) -> Result<PutOutcome> {
        self.check_open()?;
        txn.check_open()?;
        let now = self.clock.now();
        {
            let mut records = self.data.records.write();
            // Uncommitted writes of other transactions hold the key.
            if let Some(existing) = records.get(key) {
                if existing.writer().is_some() || !existing.is_expired(now) {
                    return Ok(PutOutcome::KeyExists);
                }
            }
            records.insert(
                key.to_vec(),
                StoredValue::uncommitted(value.to_vec(), expiration, txn.id()),
            );
        }
        txn.register_write(self.data.clone(), key.to_vec());
        Ok(PutOutcome::Inserted)
    }

    fn get(&self, txn: &TxnContext, key: &[u8]) -> Result<Option<StoredValue>> {
        self.check_open()?;
        let now = self.clock.now();
        let records = self.data.records.read();
        Ok(records
            .get(key)
            .filter(|r| r.is_visible_to(txn.id(), now))
            .cloned())
    }

    fn scan(&self, txn: &TxnContext) -> Result<Vec<(Vec<u8>, StoredValue)>> {
        self.check_open()?;
        let now = self.clock.now();
        let records = self.data.records.read();
        Ok(records
            .iter()
            .filter(|(_, r)| r.is_visible_to(txn.id(), now))
            .map(|(k, r)| (k.clone(), r.clone()))
            .collect())
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
