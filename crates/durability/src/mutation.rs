//! Base mutation log entry
//!
//! # Log form
//!
//! ```text
//! db_id (packed) │ txn_id (packed) │ abort_lsn (packed signed, -1 = none)
//! key (len-pfx)  │ data (nullable) │ modification time (packed) │ expiration (packed signed)
//! ```
//!
//! # Replicable form
//!
//! The log form without `txn_id` and `abort_lsn`, which only mean something
//! on the node that wrote the entry.
//!
//! `expiration` is the record's own `ExpirationToken` in its signed form
//! (negative means hours).

use strata_core::packed::{self, ByteReader};
use strata_core::{Error, ExpirationToken, Lsn, Result, Timestamp};

/// Internal database id of the before-image store in the log
pub const BEFORE_IMAGE_DB_ID: u64 = u64::MAX - 1;

/// Fields shared by every mutation entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationLogEntry {
    /// Database the record belongs to
    pub db_id: u64,
    /// Writing transaction
    pub txn_id: u64,
    /// LSN of the version this mutation supersedes
    pub abort_lsn: Option<Lsn>,
    /// Record key
    pub key: Vec<u8>,
    /// New value; `None` for deletes and tombstones
    pub data: Option<Vec<u8>>,
    /// Time of the mutation
    pub modification_time: Timestamp,
    /// Record expiration
    pub expiration: ExpirationToken,
}

impl MutationLogEntry {
    /// Entry with no superseded version, no value and no expiration
    pub fn new(db_id: u64, txn_id: u64, key: impl Into<Vec<u8>>) -> Self {
        MutationLogEntry {
            db_id,
            txn_id,
            abort_lsn: None,
            key: key.into(),
            data: None,
            modification_time: Timestamp::EPOCH,
            expiration: ExpirationToken::NEVER,
        }
    }

    /// Set the superseded version
    pub fn with_abort_lsn(mut self, lsn: Lsn) -> Self {
        self.abort_lsn = Some(lsn);
        self
    }

    /// Set the new value
    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Set the modification time
    pub fn with_modification_time(mut self, ts: Timestamp) -> Self {
        self.modification_time = ts;
        self
    }

    /// Set the record expiration
    pub fn with_expiration(mut self, expiration: ExpirationToken) -> Self {
        self.expiration = expiration;
        self
    }

    fn abort_lsn_packed(&self) -> i64 {
        match self.abort_lsn {
            Some(lsn) if !lsn.is_null() => lsn.as_u64() as i64,
            _ => -1,
        }
    }

    fn replicable_fields_len(&self) -> usize {
        packed::u64_len(self.db_id)
            + packed::byte_array_len(Some(&self.key))
            + packed::byte_array_len(self.data.as_deref())
            + packed::u64_len(self.modification_time.as_micros())
            + packed::i64_len(self.expiration.to_packed())
    }

    /// Encoded size of the log form
    pub fn log_size(&self) -> usize {
        packed::u64_len(self.txn_id)
            + packed::i64_len(self.abort_lsn_packed())
            + self.replicable_fields_len()
    }

    /// Encoded size of the replicable form
    pub fn replicable_size(&self) -> usize {
        self.replicable_fields_len()
    }

    /// Append the log form
    pub fn write_log(&self, buf: &mut Vec<u8>) {
        packed::write_u64(buf, self.db_id);
        packed::write_u64(buf, self.txn_id);
        packed::write_i64(buf, self.abort_lsn_packed());
        self.write_tail(buf);
    }

    /// Append the replicable form
    pub fn write_replicable(&self, buf: &mut Vec<u8>) {
        packed::write_u64(buf, self.db_id);
        self.write_tail(buf);
    }

    fn write_tail(&self, buf: &mut Vec<u8>) {
        packed::write_byte_array(buf, Some(&self.key));
        packed::write_byte_array(buf, self.data.as_deref());
        packed::write_u64(buf, self.modification_time.as_micros());
        packed::write_i64(buf, self.expiration.to_packed());
    }

    /// Read the log form
    pub fn read_log(reader: &mut ByteReader<'_>) -> Result<Self> {
        let db_id = reader.read_u64()?;
        let txn_id = reader.read_u64()?;
        let abort_lsn = match reader.read_i64()? {
            -1 => None,
            raw if raw < 0 => {
                return Err(Error::corruption(format!("abort LSN {} is negative", raw)))
            }
            raw => Some(Lsn::new(raw as u64)),
        };
        Self::read_tail(reader, db_id, txn_id, abort_lsn)
    }

    /// Read the replicable form; `txn_id` is 0 and `abort_lsn` is absent
    pub fn read_replicable(reader: &mut ByteReader<'_>) -> Result<Self> {
        let db_id = reader.read_u64()?;
        Self::read_tail(reader, db_id, 0, None)
    }

    fn read_tail(
        reader: &mut ByteReader<'_>,
        db_id: u64,
        txn_id: u64,
        abort_lsn: Option<Lsn>,
    ) -> Result<Self> {
        let key = reader
            .read_byte_array()?
            .ok_or_else(|| Error::corruption("mutation entry without key"))?;
        let data = reader.read_byte_array()?;
        let modification_time = Timestamp::from_micros(reader.read_u64()?);
        let expiration = ExpirationToken::from_packed(reader.read_i64()?)?;
        Ok(MutationLogEntry {
            db_id,
            txn_id,
            abort_lsn,
            key,
            data,
            modification_time,
            expiration,
        })
    }

    /// Whether the replicable form carries the same record
    pub fn matches_replicated(&self, other: &MutationLogEntry) -> bool {
        self.db_id == other.db_id
            && self.key == other.key
            && self.data == other.data
            && self.modification_time == other.modification_time
            && self.expiration == other.expiration
    }
}
