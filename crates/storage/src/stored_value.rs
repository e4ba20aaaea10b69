//! Storage-layer record wrapper with TTL and ownership
//!
//! A record in an internal store carries the bytes, the packed expiration
//! the engine uses to hide it once its TTL passes, and the transaction that
//! wrote it while that transaction is still open.

use strata_core::{ExpirationToken, Timestamp};

/// A stored record with expiration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredValue {
    value: Vec<u8>,
    expiration: ExpirationToken,
    /// Writing transaction, `None` once committed
    writer: Option<u64>,
}

impl StoredValue {
    /// Create an uncommitted record owned by `writer`
    pub fn uncommitted(value: Vec<u8>, expiration: ExpirationToken, writer: u64) -> Self {
        StoredValue {
            value,
            expiration,
            writer: Some(writer),
        }
    }

    /// Create a committed record
    pub fn committed(value: Vec<u8>, expiration: ExpirationToken) -> Self {
        StoredValue {
            value,
            expiration,
            writer: None,
        }
    }

    /// Record bytes
    #[inline]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Consume and return the bytes
    #[inline]
    pub fn into_value(self) -> Vec<u8> {
        self.value
    }

    /// Packed expiration
    #[inline]
    pub fn expiration(&self) -> ExpirationToken {
        self.expiration
    }

    /// Open transaction that owns this record, if any
    #[inline]
    pub fn writer(&self) -> Option<u64> {
        self.writer
    }

    /// Mark committed
    pub(crate) fn commit(&mut self) {
        self.writer = None;
    }

    /// Check if this record has expired
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expiration.is_expired(now)
    }

    /// Whether a reader in transaction `txn_id` may see this record
    pub fn is_visible_to(&self, txn_id: u64, now: Timestamp) -> bool {
        !self.is_expired(now) && self.writer.map_or(true, |w| w == txn_id)
    }
}
