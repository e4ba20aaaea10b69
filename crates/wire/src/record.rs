//! Replication wire record
//!
//! # Frame
//!
//! ```text
//! ┌──────────┬─────────────┬───────────────┬────────────┬──────────────────────────┬──────────────────────┐
//! │ Type (1) │ Version (1) │ Item size (4) │ LSN (8)    │ Entry (replicable form)  │ Image (len-pfx, opt) │
//! └──────────┴─────────────┴───────────────┴────────────┴──────────────────────────┴──────────────────────┘
//! ```
//!
//! The version written is `min(entry version, protocol version)`. Below
//! `BEFORE_IMAGE_LOG_VERSION` neither the TTL nor the image is written.
//! The image is present only when attached; the item size delimits it.
//!
//! # Resolution
//!
//! 1. A memo on the log item is reused, after re-checking expiration
//!    against the current time.
//! 2. Otherwise the raw item is decoded; a type without before-image
//!    support fails with `UnsupportedEntryType`.
//! 3. With an enabled store and a live TTL, `abort_lsn` is looked up and a
//!    hit is memoized on the item.
//! 4. Anything else ships without an image. Expiry is not an error.

use tracing::trace;

use strata_core::log_version::has_before_image;
use strata_core::packed::{self, ByteReader};
use strata_core::{Clock, Error, Lsn, Result, Timestamp};
use strata_durability::{LogEntryHeader, VersionedMutationLogEntry, LOG_ENTRY_HEADER_SIZE};
use strata_storage::BeforeImageStore;

use crate::log_item::{BeforeImageMemo, LogItem};

/// A mutation ready to ship, with its before-image when one applies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationWireRecord {
    header: LogEntryHeader,
    entry: VersionedMutationLogEntry,
    before_image: Option<Vec<u8>>,
}

impl ReplicationWireRecord {
    /// Resolve the record for `item`
    pub fn new(
        item: &mut LogItem,
        store: &dyn BeforeImageStore,
        clock: &dyn Clock,
    ) -> Result<Self> {
        let header = *item.header();
        let now = clock.now();

        if let Some(memo) = item.memo_mut() {
            if memo.image.is_some() && memo.is_expired(now) {
                trace!(lsn = %header.lsn, "memoized before-image expired, dropping");
                memo.image = None;
            }
            return Ok(ReplicationWireRecord {
                header,
                entry: memo.entry.clone(),
                before_image: memo.image.clone(),
            });
        }

        let entry =
            VersionedMutationLogEntry::read(header.entry_type, item.buffer(), header.version)?;
        let before_image = Self::lookup(&entry, header.lsn, store, now)?;
        if let Some(image) = &before_image {
            item.set_memo(BeforeImageMemo {
                entry: entry.clone(),
                ttl: entry.before_image_ttl(),
                image: Some(image.clone()),
            });
        }
        Ok(ReplicationWireRecord {
            header,
            entry,
            before_image,
        })
    }

    fn lookup(
        entry: &VersionedMutationLogEntry,
        lsn: Lsn,
        store: &dyn BeforeImageStore,
        now: Timestamp,
    ) -> Result<Option<Vec<u8>>> {
        let ttl = entry.before_image_ttl();
        if !store.is_enabled() || ttl.is_none() {
            return Ok(None);
        }
        let Some(abort_lsn) = entry.base().abort_lsn else {
            return Ok(None);
        };
        if ttl
            .logged_expiration_at(entry.base().modification_time)
            .is_expired(now)
        {
            trace!(%lsn, %abort_lsn, "before-image expired, shipping without it");
            return Ok(None);
        }
        let image = store.get(abort_lsn, None)?;
        if image.is_none() {
            trace!(%lsn, %abort_lsn, "before-image not found, shipping without it");
        }
        Ok(image)
    }

    /// Header of the source log item
    pub fn header(&self) -> &LogEntryHeader {
        &self.header
    }

    /// Log position
    pub fn lsn(&self) -> Lsn {
        self.header.lsn
    }

    /// Decoded entry
    pub fn entry(&self) -> &VersionedMutationLogEntry {
        &self.entry
    }

    /// Attached before-image bytes
    pub fn before_image(&self) -> Option<&[u8]> {
        self.before_image.as_deref()
    }

    /// Version written for a peer speaking `protocol_version`
    pub fn version_for(&self, protocol_version: u8) -> u8 {
        self.header.version.min(protocol_version)
    }

    fn image_len(&self, version: u8) -> usize {
        match &self.before_image {
            Some(image) if has_before_image(version) => packed::byte_array_len(Some(image)),
            _ => 0,
        }
    }

    /// Encoded size for a peer speaking `protocol_version`
    pub fn size(&self, protocol_version: u8) -> Result<usize> {
        let version = self.version_for(protocol_version);
        Ok(LOG_ENTRY_HEADER_SIZE + self.entry.replicable_size(version)? + self.image_len(version))
    }

    /// Append the frame for a peer speaking `protocol_version`
    pub fn write(&self, buf: &mut Vec<u8>, protocol_version: u8) -> Result<()> {
        let version = self.version_for(protocol_version);
        let expected = self.size(protocol_version)?;
        let body_len = expected - LOG_ENTRY_HEADER_SIZE;
        let item_size = u32::try_from(body_len)
            .map_err(|_| Error::corruption(format!("wire item of {} bytes", body_len)))?;

        let start = buf.len();
        LogEntryHeader {
            entry_type: self.header.entry_type,
            version,
            item_size,
            lsn: self.header.lsn,
        }
        .write(buf);
        self.entry.write_replicable(buf, version)?;
        if has_before_image(version) {
            if let Some(image) = &self.before_image {
                packed::write_byte_array(buf, Some(image));
            }
        }

        let actual = buf.len() - start;
        if actual != expected {
            buf.truncate(start);
            return Err(Error::SizeMismatch { expected, actual });
        }
        Ok(())
    }

    /// Decode one frame from the front of `bytes`, returning the bytes consumed
    pub fn read(bytes: &[u8]) -> Result<(Self, usize)> {
        let header = LogEntryHeader::read(bytes)?;
        let end = LOG_ENTRY_HEADER_SIZE + header.item_size as usize;
        if bytes.len() < end {
            return Err(Error::InsufficientData {
                needed: end,
                have: bytes.len(),
            });
        }
        let mut reader = ByteReader::new(&bytes[LOG_ENTRY_HEADER_SIZE..end]);
        let entry =
            VersionedMutationLogEntry::read_replicable_from(
                header.entry_type,
                &mut reader,
                header.version,
            )?;
        let before_image = if has_before_image(header.version) && !reader.is_empty() {
            reader.read_byte_array()?
        } else {
            None
        };
        if !reader.is_empty() {
            return Err(Error::corruption(format!(
                "{} trailing bytes in wire record {}",
                reader.remaining(),
                header.lsn
            )));
        }
        Ok((
            ReplicationWireRecord {
                header,
                entry,
                before_image,
            },
            end,
        ))
    }

    /// Whether two records ship the same mutation and the same before-image
    pub fn matches(&self, other: &ReplicationWireRecord) -> bool {
        let version = self.header.version.min(other.header.version);
        self.header.entry_type == other.header.entry_type
            && self.header.lsn == other.header.lsn
            && self.entry.matches_replicated(&other.entry, version)
            && self.before_image == other.before_image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use strata_core::{ManualClock, TtlDescriptor, BEFORE_IMAGE_LOG_VERSION, CURRENT_LOG_VERSION};
    use strata_durability::{LogBuffer, LogEntryType, MutationLogEntry};
    use strata_storage::{
        BeforeImageRecordStore, CaptureCause, MemoryEngine, NullBeforeImageRecordStore,
        StorageEngine,
    };

    struct Fixture {
        clock: Arc<ManualClock>,
        engine: Arc<MemoryEngine>,
        store: BeforeImageRecordStore,
        log: LogBuffer,
    }

    impl Fixture {
        fn new() -> Self {
            let clock = Arc::new(ManualClock::new(Timestamp::from_secs(3_600 * 500)));
            let engine = Arc::new(MemoryEngine::with_clock(clock.clone()));
            let store = BeforeImageRecordStore::new(engine.clone());
            Fixture {
                clock,
                engine,
                store,
                log: LogBuffer::new(),
            }
        }

        /// Capture `image` for `abort_lsn` and log the superseding update
        fn update(&self, abort_lsn: u64, image: &[u8], ttl: TtlDescriptor) -> LogItem {
            let now = self.clock.now();
            let txn = self.engine.begin_txn();
            self.store
                .put(&txn, Lsn::new(abort_lsn), image, ttl, CaptureCause::Update)
                .unwrap();
            let base = MutationLogEntry::new(1, txn.id(), b"k".to_vec())
                .with_abort_lsn(Lsn::new(abort_lsn))
                .with_data(b"new".to_vec())
                .with_modification_time(now);
            let entry = VersionedMutationLogEntry::new(LogEntryType::Update, base, ttl).unwrap();
            let lsn = self.log.append(&entry, CURRENT_LOG_VERSION).unwrap();
            txn.commit().unwrap();
            LogItem::new(self.log.read(lsn).unwrap().unwrap())
        }
    }

    #[test]
    fn test_attaches_live_image_and_memoizes() {
        let fx = Fixture::new();
        let mut item = fx.update(10, b"old", TtlDescriptor::days(1));
        let record = ReplicationWireRecord::new(&mut item, &fx.store, fx.clock.as_ref()).unwrap();
        assert_eq!(record.before_image(), Some(&b"old"[..]));
        let memo = item.memo().unwrap();
        assert_eq!(memo.ttl, TtlDescriptor::days(1));
        assert_eq!(memo.image.as_deref(), Some(&b"old"[..]));
    }

    #[test]
    fn test_memo_reused_without_store_lookup() {
        let fx = Fixture::new();
        let mut item = fx.update(10, b"old", TtlDescriptor::days(1));
        let first = ReplicationWireRecord::new(&mut item, &fx.store, fx.clock.as_ref()).unwrap();
        fx.store.close().unwrap();
        // a closed store would fail a lookup
        let second = ReplicationWireRecord::new(&mut item, &fx.store, fx.clock.as_ref()).unwrap();
        assert!(first.matches(&second));
    }

    #[test]
    fn test_memoized_image_expires() {
        let fx = Fixture::new();
        let mut item = fx.update(10, b"old", TtlDescriptor::hours(1));
        let first = ReplicationWireRecord::new(&mut item, &fx.store, fx.clock.as_ref()).unwrap();
        assert!(first.before_image().is_some());

        fx.clock.advance(Duration::from_secs(2 * 3_600));
        let second = ReplicationWireRecord::new(&mut item, &fx.store, fx.clock.as_ref()).unwrap();
        assert!(second.before_image().is_none());
        assert!(item.memo().unwrap().image.is_none());
    }

    #[test]
    fn test_disabled_store_ships_without_image() {
        let fx = Fixture::new();
        let mut item = fx.update(10, b"old", TtlDescriptor::days(1));
        let record =
            ReplicationWireRecord::new(&mut item, &NullBeforeImageRecordStore, fx.clock.as_ref())
                .unwrap();
        assert!(record.before_image().is_none());
        assert!(item.memo().is_none());
    }

    #[test]
    fn test_control_item_is_protocol_violation() {
        let fx = Fixture::new();
        let lsn = fx
            .log
            .append_control(LogEntryType::TxnCommit, 1, CURRENT_LOG_VERSION)
            .unwrap();
        let mut item = LogItem::new(fx.log.read(lsn).unwrap().unwrap());
        let err = ReplicationWireRecord::new(&mut item, &fx.store, fx.clock.as_ref()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedEntryType { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_write_read_with_image() {
        let fx = Fixture::new();
        let mut item = fx.update(10, b"old", TtlDescriptor::days(1));
        let record = ReplicationWireRecord::new(&mut item, &fx.store, fx.clock.as_ref()).unwrap();
        let mut buf = Vec::new();
        record.write(&mut buf, CURRENT_LOG_VERSION).unwrap();
        assert_eq!(buf.len(), record.size(CURRENT_LOG_VERSION).unwrap());

        let (decoded, used) = ReplicationWireRecord::read(&buf).unwrap();
        assert_eq!(used, buf.len());
        assert!(record.matches(&decoded));
        assert_eq!(decoded.entry().base().abort_lsn, None);
        assert_eq!(decoded.entry().before_image_ttl(), TtlDescriptor::days(1));
    }

    #[test]
    fn test_old_protocol_omits_ttl_and_image() {
        let fx = Fixture::new();
        let mut item = fx.update(10, b"old", TtlDescriptor::days(1));
        let record = ReplicationWireRecord::new(&mut item, &fx.store, fx.clock.as_ref()).unwrap();
        let old = BEFORE_IMAGE_LOG_VERSION - 1;
        let mut buf = Vec::new();
        record.write(&mut buf, old).unwrap();
        assert_eq!(buf.len(), record.size(old).unwrap());
        assert_eq!(buf[1], old);

        let (decoded, _) = ReplicationWireRecord::read(&buf).unwrap();
        assert!(decoded.before_image().is_none());
        assert!(decoded.entry().before_image_ttl().is_none());
        assert!(!record.matches(&decoded));
    }

    #[test]
    fn test_matches_compares_image() {
        let fx = Fixture::new();
        let mut with_image = fx.update(10, b"old", TtlDescriptor::days(1));
        let attached =
            ReplicationWireRecord::new(&mut with_image, &fx.store, fx.clock.as_ref()).unwrap();
        let mut fresh = LogItem::new(fx.log.read(attached.lsn()).unwrap().unwrap());
        let null = NullBeforeImageRecordStore;
        let bare = ReplicationWireRecord::new(&mut fresh, &null, fx.clock.as_ref()).unwrap();
        assert!(!attached.matches(&bare));
        assert!(bare.matches(&bare.clone()));
    }

    #[test]
    fn test_truncated_frame() {
        let fx = Fixture::new();
        let mut item = fx.update(10, b"old", TtlDescriptor::days(1));
        let record = ReplicationWireRecord::new(&mut item, &fx.store, fx.clock.as_ref()).unwrap();
        let mut buf = Vec::new();
        record.write(&mut buf, CURRENT_LOG_VERSION).unwrap();
        assert!(matches!(
            ReplicationWireRecord::read(&buf[..buf.len() - 1]),
            Err(Error::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_engine_clock_drives_expiry() {
        let fx = Fixture::new();
        let mut item = fx.update(10, b"old", TtlDescriptor::hours(1));
        fx.clock.advance(Duration::from_secs(3 * 3_600));
        let record =
            ReplicationWireRecord::new(&mut item, &fx.store, fx.engine.clock().as_ref()).unwrap();
        assert!(record.before_image().is_none());
        assert!(item.memo().is_none());
    }
}
