//! In-flight log item with its resolution memo

use strata_core::{Lsn, Timestamp, TtlDescriptor};
use strata_durability::{LogEntryHeader, RawLogItem, VersionedMutationLogEntry};

/// Result of an earlier before-image resolution of the same item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeforeImageMemo {
    /// Decoded entry
    pub entry: VersionedMutationLogEntry,
    /// TTL the image was captured with
    pub ttl: TtlDescriptor,
    /// Image bytes; cleared once found expired
    pub image: Option<Vec<u8>>,
}

impl BeforeImageMemo {
    /// Whether the memoized image has expired as of `now`
    ///
    /// The expiration is recomputed from the TTL and the mutation time of
    /// the superseding entry, the instant the image was captured.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.ttl
            .logged_expiration_at(self.entry.base().modification_time)
            .is_expired(now)
    }
}

/// Log item on its way to a replica
///
/// Owns the memo filled by the first successful before-image resolution;
/// the memo lives and dies with the item.
#[derive(Debug, Clone)]
pub struct LogItem {
    raw: RawLogItem,
    memo: Option<BeforeImageMemo>,
}

impl LogItem {
    /// Wrap a raw item read from the log
    pub fn new(raw: RawLogItem) -> Self {
        LogItem { raw, memo: None }
    }

    /// Frame header
    pub fn header(&self) -> &LogEntryHeader {
        &self.raw.header
    }

    /// Body bytes
    pub fn buffer(&self) -> &[u8] {
        &self.raw.body
    }

    /// Log position
    pub fn lsn(&self) -> Lsn {
        self.raw.header.lsn
    }

    /// Memo of an earlier resolution
    pub fn memo(&self) -> Option<&BeforeImageMemo> {
        self.memo.as_ref()
    }

    pub(crate) fn memo_mut(&mut self) -> Option<&mut BeforeImageMemo> {
        self.memo.as_mut()
    }

    pub(crate) fn set_memo(&mut self, memo: BeforeImageMemo) {
        self.memo = Some(memo);
    }
}

impl From<RawLogItem> for LogItem {
    fn from(raw: RawLogItem) -> Self {
        LogItem::new(raw)
    }
}
