//! Capture coordination
//!
//! `CaptureCoordinator` ties a primary mutation to its before-image: inside
//! the caller's transaction it captures the prior version (for updates,
//! deletes and tombstones), logs the capture as an insertion into the
//! before-image db, then logs the mutation itself with the TTL the image
//! was captured with.
//!
//! The store implementation is chosen once, in `new`, from the config.
//! Nothing downstream branches on whether capture is enabled.

use std::sync::Arc;

use tracing::debug;

use strata_core::log_version::has_before_image;
use strata_core::{Clock, Lsn, Result, Timestamp, TtlDescriptor};
use strata_durability::{
    LogBuffer, LogEntryType, MutationLogEntry, VersionedMutationLogEntry, BEFORE_IMAGE_DB_ID,
};
use strata_storage::{
    BeforeImagePayload, BeforeImageRecordStore, BeforeImageStats, BeforeImageStore, CaptureCause,
    NullBeforeImageRecordStore, StorageEngine, TxnContext,
};

use crate::config::BeforeImageConfig;
use crate::feeder::Feeder;

/// The version a mutation supersedes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorVersion {
    /// LSN of the superseded version
    pub lsn: Lsn,
    /// Its value, `None` if it had none
    pub value: Option<Vec<u8>>,
    /// When it was written
    pub modification_time: Timestamp,
}

impl PriorVersion {
    /// Prior version with a value
    pub fn new(lsn: Lsn, value: impl Into<Vec<u8>>, modification_time: Timestamp) -> Self {
        PriorVersion {
            lsn,
            value: Some(value.into()),
            modification_time,
        }
    }
}

/// Cause recorded for a mutation type; `None` when nothing is superseded
pub fn cause_of(entry_type: LogEntryType) -> Option<CaptureCause> {
    match entry_type {
        LogEntryType::Update => Some(CaptureCause::Update),
        LogEntryType::Delete => Some(CaptureCause::Delete),
        LogEntryType::Tombstone => Some(CaptureCause::Tombstone),
        _ => None,
    }
}

/// Runs mutations with before-image capture
#[derive(Debug)]
pub struct CaptureCoordinator {
    engine: Arc<dyn StorageEngine>,
    store: Arc<dyn BeforeImageStore>,
    log: Arc<LogBuffer>,
    config: BeforeImageConfig,
}

impl CaptureCoordinator {
    /// Validate `config` and select the store implementation
    ///
    /// Capture is enabled only when the config enables it and the log
    /// version can carry the before-image TTL.
    pub fn new(
        engine: Arc<dyn StorageEngine>,
        log: Arc<LogBuffer>,
        config: BeforeImageConfig,
    ) -> Result<Self> {
        config.validate()?;
        let store: Arc<dyn BeforeImageStore> =
            if config.enabled && has_before_image(config.log_version) {
                let mut store = BeforeImageRecordStore::new(Arc::clone(&engine))
                    .with_name(config.store_name.clone());
                if let Some(capacity) = config.entry_cache_capacity {
                    store = store.with_cache(capacity);
                }
                Arc::new(store)
            } else {
                Arc::new(NullBeforeImageRecordStore)
            };
        Self::with_store(engine, log, config, store)
    }

    /// Use a store built by the caller (for example one with a capture hook)
    pub fn with_store(
        engine: Arc<dyn StorageEngine>,
        log: Arc<LogBuffer>,
        config: BeforeImageConfig,
        store: Arc<dyn BeforeImageStore>,
    ) -> Result<Self> {
        config.validate()?;
        debug!(
            enabled = store.is_enabled(),
            ttl = %config.ttl(),
            log_version = config.log_version,
            "before-image capture configured"
        );
        Ok(CaptureCoordinator {
            engine,
            store,
            log,
            config,
        })
    }

    /// Selected before-image store
    pub fn store(&self) -> &Arc<dyn BeforeImageStore> {
        &self.store
    }

    /// Log the coordinator appends to
    pub fn log(&self) -> &Arc<LogBuffer> {
        &self.log
    }

    /// Active configuration
    pub fn config(&self) -> &BeforeImageConfig {
        &self.config
    }

    /// TTL for a mutation of `entry_type`
    ///
    /// The configured TTL for updates, deletes and tombstones;
    /// `TtlDescriptor::NONE` for inserts and control entries.
    pub fn ttl_for(&self, entry_type: LogEntryType) -> TtlDescriptor {
        match cause_of(entry_type) {
            Some(_) => self.config.ttl(),
            None => TtlDescriptor::NONE,
        }
    }

    /// Start a transaction on the engine
    pub fn begin(&self) -> TxnContext {
        self.engine.begin_txn()
    }

    /// Commit `txn` and log its commit marker
    pub fn commit(&self, txn: &TxnContext) -> Result<Lsn> {
        txn.commit()?;
        self.log
            .append_control(LogEntryType::TxnCommit, txn.id(), self.config.log_version)
    }

    /// Abort `txn` and log its abort marker
    pub fn abort(&self, txn: &TxnContext) -> Result<Lsn> {
        txn.abort()?;
        self.log
            .append_control(LogEntryType::TxnAbort, txn.id(), self.config.log_version)
    }

    /// Insert a new record
    pub fn insert(&self, txn: &TxnContext, db_id: u64, key: &[u8], value: &[u8]) -> Result<Lsn> {
        self.mutate(txn, LogEntryType::Insert, db_id, key, Some(value), None)
    }

    /// Replace the value of a record
    pub fn update(
        &self,
        txn: &TxnContext,
        db_id: u64,
        key: &[u8],
        value: &[u8],
        prior: &PriorVersion,
    ) -> Result<Lsn> {
        self.mutate(txn, LogEntryType::Update, db_id, key, Some(value), Some(prior))
    }

    /// Delete a record
    pub fn delete(
        &self,
        txn: &TxnContext,
        db_id: u64,
        key: &[u8],
        prior: &PriorVersion,
    ) -> Result<Lsn> {
        self.mutate(txn, LogEntryType::Delete, db_id, key, None, Some(prior))
    }

    /// Logically delete a record, keeping it replicable
    pub fn tombstone(
        &self,
        txn: &TxnContext,
        db_id: u64,
        key: &[u8],
        prior: &PriorVersion,
    ) -> Result<Lsn> {
        self.mutate(txn, LogEntryType::Tombstone, db_id, key, None, Some(prior))
    }

    fn mutate(
        &self,
        txn: &TxnContext,
        entry_type: LogEntryType,
        db_id: u64,
        key: &[u8],
        value: Option<&[u8]>,
        prior: Option<&PriorVersion>,
    ) -> Result<Lsn> {
        txn.check_open()?;
        let now = self.engine.clock().now();
        let version = self.config.log_version;

        let mut ttl = TtlDescriptor::NONE;
        if let (Some(cause), Some(prior)) = (cause_of(entry_type), prior) {
            if self.capture(txn, prior, cause, now)? {
                ttl = self.ttl_for(entry_type);
            }
        }

        let mut base =
            MutationLogEntry::new(db_id, txn.id(), key.to_vec()).with_modification_time(now);
        base.abort_lsn = prior.map(|p| p.lsn);
        base.data = value.map(<[u8]>::to_vec);
        let entry = VersionedMutationLogEntry::new(entry_type, base, ttl)?;
        self.log.append(&entry, version)
    }

    /// Store the prior version, then log it as an internal insertion
    ///
    /// The stored record, the insertion and the mutation entry all take
    /// their expiration from `now`, the mutation's modification time.
    fn capture(
        &self,
        txn: &TxnContext,
        prior: &PriorVersion,
        cause: CaptureCause,
        now: Timestamp,
    ) -> Result<bool> {
        let expiration = self.config.ttl().logged_expiration_at(now);
        let mut payload =
            BeforeImagePayload::builder().modification_time(prior.modification_time);
        if let Some(value) = &prior.value {
            payload = payload.image(value.clone());
        }
        let bytes = payload.build().marshal();
        if !self
            .store
            .put_expiring(txn, prior.lsn, &bytes, expiration, cause)?
        {
            return Ok(false);
        }

        let key = prior.lsn.to_key_bytes().to_vec();
        let base = MutationLogEntry::new(BEFORE_IMAGE_DB_ID, txn.id(), key)
            .with_data(bytes)
            .with_modification_time(now)
            .with_expiration(expiration);
        let entry =
            VersionedMutationLogEntry::new(LogEntryType::Insert, base, TtlDescriptor::NONE)?;
        self.log.append(&entry, self.config.log_version)?;
        Ok(true)
    }

    /// Feeder shipping this coordinator's log to a peer
    pub fn feeder(&self, protocol_version: u8) -> Result<Feeder> {
        Feeder::new(
            Arc::clone(&self.log),
            Arc::clone(&self.store),
            self.engine.clock(),
            protocol_version,
        )
    }

    /// Capture counters
    pub fn stats(&self, clear: bool) -> BeforeImageStats {
        self.store.stats(clear)
    }

    /// Release the before-image store
    pub fn close(&self) -> Result<()> {
        self.store.close()
    }
}
