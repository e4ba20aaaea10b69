//! BeforeImageRecordStore: the enabled before-image store
//!
//! # Lifecycle
//!
//! The backing internal store is created lazily by the first `put`, through
//! a `OnceCell` so that concurrent first writers race to a single
//! create-or-open call. Steady-state puts and gets read the cell without
//! taking any lock. A `get` that finds the cell empty is a sequencing bug
//! in the caller and fails with `Error::StoreNotCreated`.
//!
//! # Keys and values
//!
//! Key: `abort_lsn` as 8 big-endian bytes. Value: `BeforeImagePayload`
//! bytes, written no-overwrite with the expiration derived from the TTL at
//! capture time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, error};

use strata_core::{Error, ExpirationToken, Lsn, Result, TtlDescriptor};

use super::stats::StatsCounters;
use super::{
    BeforeImageEntryCache, BeforeImagePayload, BeforeImageStats, BeforeImageStore, CaptureCause,
    CaptureHook,
};
use crate::engine::{InternalStore, PutOutcome, StorageEngine};
use crate::txn::TxnContext;

/// Default name of the internal before-image store
pub const DEFAULT_STORE_NAME: &str = "_sys_before_image";

/// Cached copy of a committed before-image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedImage {
    /// Payload bytes as stored
    pub bytes: Vec<u8>,
    /// Expiration of the stored record
    pub expiration: ExpirationToken,
}

/// Enabled before-image store over an engine-owned internal store
#[derive(Debug)]
pub struct BeforeImageRecordStore {
    engine: Arc<dyn StorageEngine>,
    name: String,
    handle: OnceCell<Arc<dyn InternalStore>>,
    closed: AtomicBool,
    stats: StatsCounters,
    cache: Option<BeforeImageEntryCache<Lsn, CachedImage>>,
    hook: Option<Arc<dyn CaptureHook>>,
}

impl BeforeImageRecordStore {
    /// Store named `DEFAULT_STORE_NAME` on `engine`
    pub fn new(engine: Arc<dyn StorageEngine>) -> Self {
        Self {
            engine,
            name: DEFAULT_STORE_NAME.to_string(),
            handle: OnceCell::new(),
            closed: AtomicBool::new(false),
            stats: StatsCounters::default(),
            cache: None,
            hook: None,
        }
    }

    /// Use a different internal store name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Enable the read-through entry cache
    pub fn with_cache(mut self, capacity: usize) -> Self {
        self.cache = Some(BeforeImageEntryCache::new(capacity));
        self
    }

    /// Install a hook run before each capture
    pub fn with_hook(mut self, hook: Arc<dyn CaptureHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Internal store name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the backing store has been created
    pub fn is_created(&self) -> bool {
        self.handle.get().is_some()
    }

    /// Engine id of the backing store, once created
    pub fn store_id(&self) -> Option<u64> {
        self.handle.get().map(|h| h.id())
    }

    /// Entry cache, when enabled
    pub fn cache(&self) -> Option<&BeforeImageEntryCache<Lsn, CachedImage>> {
        self.cache.as_ref()
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(Error::StoreClosed)
        } else {
            Ok(())
        }
    }

    fn handle_or_create(&self) -> Result<&Arc<dyn InternalStore>> {
        self.handle.get_or_try_init(|| {
            let handle = self.engine.open_internal_store(&self.name)?;
            debug!(store = %self.name, id = handle.id(), "opened before-image store");
            Ok(handle)
        })
    }

    fn existing_handle(&self, abort_lsn: Lsn) -> Result<&Arc<dyn InternalStore>> {
        self.handle.get().ok_or_else(|| {
            error!(
                lsn = %abort_lsn,
                store = %self.name,
                "before-image read before the store was created"
            );
            Error::StoreNotCreated
        })
    }

    fn cached(&self, abort_lsn: Lsn) -> Option<Vec<u8>> {
        let cached = self.cache.as_ref()?.get(&abort_lsn)?;
        if cached.expiration.is_expired(self.engine.clock().now()) {
            return None;
        }
        Some(cached.bytes)
    }

    /// Every live before-image in LSN order, decoded
    ///
    /// Diagnostic full scan; returns nothing if the store was never created.
    pub fn dump(&self) -> Result<Vec<(Lsn, BeforeImagePayload)>> {
        self.check_open()?;
        let Some(handle) = self.handle.get() else {
            return Ok(Vec::new());
        };
        let txn = self.engine.local_txn();
        let records = handle.scan(&txn)?;
        txn.close()?;
        records
            .into_iter()
            .map(|(key, value)| {
                let lsn = Lsn::from_key_bytes(&key).ok_or_else(|| {
                    Error::corruption(format!("before-image key of {} bytes", key.len()))
                })?;
                Ok((lsn, BeforeImagePayload::from_bytes(value.value())?))
            })
            .collect()
    }
}

impl BeforeImageStore for BeforeImageRecordStore {
    fn is_enabled(&self) -> bool {
        true
    }

    fn put(
        &self,
        txn: &TxnContext,
        abort_lsn: Lsn,
        data: &[u8],
        ttl: TtlDescriptor,
        cause: CaptureCause,
    ) -> Result<bool> {
        let expiration = ttl.logged_expiration_at(self.engine.clock().now());
        self.put_expiring(txn, abort_lsn, data, expiration, cause)
    }

    fn put_expiring(
        &self,
        txn: &TxnContext,
        abort_lsn: Lsn,
        data: &[u8],
        expiration: ExpirationToken,
        cause: CaptureCause,
    ) -> Result<bool> {
        self.check_open()?;
        if let Some(hook) = &self.hook {
            hook.before_put(abort_lsn, cause)?;
        }
        let handle = self.handle_or_create()?;
        match handle.put_no_overwrite(txn, &abort_lsn.to_key_bytes(), data, expiration)? {
            PutOutcome::Inserted => {
                self.stats.record(cause, data.len());
                Ok(true)
            }
            PutOutcome::KeyExists => {
                error!(lsn = %abort_lsn, %cause, "before-image already captured");
                Err(Error::DuplicateBeforeImage { lsn: abort_lsn })
            }
        }
    }

    fn get(&self, abort_lsn: Lsn, txn: Option<&TxnContext>) -> Result<Option<Vec<u8>>> {
        self.check_open()?;
        let handle = self.existing_handle(abort_lsn)?;
        let key = abort_lsn.to_key_bytes();

        let Some(txn) = txn else {
            if let Some(bytes) = self.cached(abort_lsn) {
                return Ok(Some(bytes));
            }
            let local = self.engine.local_txn();
            let found = handle.get(&local, &key)?;
            local.close()?;
            return Ok(found.map(|record| {
                if let Some(cache) = &self.cache {
                    cache.put(
                        abort_lsn,
                        CachedImage {
                            bytes: record.value().to_vec(),
                            expiration: record.expiration(),
                        },
                    );
                }
                record.into_value()
            }));
        };

        Ok(handle.get(txn, &key)?.map(|record| record.into_value()))
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(handle) = self.handle.get() {
            handle.close()?;
            debug!(store = %self.name, "closed before-image store");
        }
        Ok(())
    }

    fn stats(&self, clear: bool) -> BeforeImageStats {
        self.stats.snapshot(clear)
    }
}
