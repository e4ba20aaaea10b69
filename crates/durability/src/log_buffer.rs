//! In-memory append-only log
//!
//! Items are framed as `LogEntryHeader` + body + CRC32 (big-endian) of the
//! body. The LSN of an item is its byte offset in the log, so LSNs are
//! strictly increasing and never reused.

use byteorder::{BigEndian, ByteOrder};
use crc32fast::Hasher;
use parking_lot::RwLock;

use strata_core::log_version::check_supported;
use strata_core::packed;
use strata_core::{Error, Lsn, Result};

use crate::entry_type::LogEntryType;
use crate::header::{LogEntryHeader, LOG_ENTRY_HEADER_SIZE};
use crate::versioned::VersionedMutationLogEntry;

const CRC_SIZE: usize = 4;

/// Raw log item: header plus body bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLogItem {
    /// Frame header
    pub header: LogEntryHeader,
    /// Encoded body
    pub body: Vec<u8>,
}

impl RawLogItem {
    /// Size of the framed item in the log
    pub fn framed_len(&self) -> usize {
        LOG_ENTRY_HEADER_SIZE + self.body.len() + CRC_SIZE
    }

    /// Decode the body as a mutation entry
    pub fn decode_mutation(&self) -> Result<VersionedMutationLogEntry> {
        VersionedMutationLogEntry::read(self.header.entry_type, &self.body, self.header.version)
    }

    /// Transaction id carried by a control item
    pub fn control_txn_id(&self) -> Result<u64> {
        let entry_type = self.header.log_entry_type()?;
        if !entry_type.is_control() {
            return Err(Error::UnsupportedEntryType {
                entry_type: self.header.entry_type,
            });
        }
        let mut reader = packed::ByteReader::new(&self.body);
        let txn_id = reader.read_u64()?;
        if !reader.is_empty() {
            return Err(Error::corruption(format!(
                "{} trailing bytes after control item",
                reader.remaining()
            )));
        }
        Ok(txn_id)
    }
}

#[derive(Debug, Default)]
struct LogInner {
    bytes: Vec<u8>,
    offsets: Vec<u64>,
}

/// Append-only log held in memory
#[derive(Debug, Default)]
pub struct LogBuffer {
    inner: RwLock<LogInner>,
}

impl LogBuffer {
    /// Empty log
    pub fn new() -> Self {
        Self::default()
    }

    fn compute_crc(data: &[u8]) -> u32 {
        let mut hasher = Hasher::new();
        hasher.update(data);
        hasher.finalize()
    }

    fn append_frame(&self, entry_type: LogEntryType, version: u8, body: &[u8]) -> Result<Lsn> {
        let item_size = u32::try_from(body.len())
            .map_err(|_| Error::corruption(format!("log item of {} bytes", body.len())))?;
        let mut inner = self.inner.write();
        let lsn = Lsn::new(inner.bytes.len() as u64);
        LogEntryHeader::new(entry_type, version, item_size, lsn).write(&mut inner.bytes);
        inner.bytes.extend_from_slice(body);
        let mut crc = [0u8; CRC_SIZE];
        BigEndian::write_u32(&mut crc, Self::compute_crc(body));
        inner.bytes.extend_from_slice(&crc);
        inner.offsets.push(lsn.as_u64());
        Ok(lsn)
    }

    /// Append a mutation entry at `version`, returning its LSN
    pub fn append(&self, entry: &VersionedMutationLogEntry, version: u8) -> Result<Lsn> {
        let mut body = Vec::with_capacity(entry.size(version)?);
        entry.write(&mut body, version)?;
        self.append_frame(entry.entry_type(), version, &body)
    }

    /// Append a control entry whose body is the transaction id
    pub fn append_control(
        &self,
        entry_type: LogEntryType,
        txn_id: u64,
        version: u8,
    ) -> Result<Lsn> {
        check_supported(version)?;
        if !entry_type.is_control() {
            return Err(Error::corruption(format!(
                "{:?} is not a control entry",
                entry_type
            )));
        }
        let mut body = Vec::new();
        packed::write_u64(&mut body, txn_id);
        self.append_frame(entry_type, version, &body)
    }

    /// Item at `lsn`, verifying its checksum
    pub fn read(&self, lsn: Lsn) -> Result<Option<RawLogItem>> {
        let inner = self.inner.read();
        if inner.offsets.binary_search(&lsn.as_u64()).is_err() {
            return Ok(None);
        }
        Self::decode_at(&inner.bytes, lsn.as_u64() as usize).map(|(item, _)| Some(item))
    }

    fn decode_at(bytes: &[u8], offset: usize) -> Result<(RawLogItem, usize)> {
        let header = LogEntryHeader::read(&bytes[offset..])?;
        let body_start = offset + LOG_ENTRY_HEADER_SIZE;
        let body_end = body_start + header.item_size as usize;
        if bytes.len() < body_end + CRC_SIZE {
            return Err(Error::InsufficientData {
                needed: body_end + CRC_SIZE - offset,
                have: bytes.len() - offset,
            });
        }
        let body = &bytes[body_start..body_end];
        let stored = BigEndian::read_u32(&bytes[body_end..body_end + CRC_SIZE]);
        let computed = Self::compute_crc(body);
        if stored != computed {
            return Err(Error::corruption(format!(
                "checksum mismatch at {}: stored {:08x}, computed {:08x}",
                header.lsn, stored, computed
            )));
        }
        Ok((
            RawLogItem {
                header,
                body: body.to_vec(),
            },
            body_end + CRC_SIZE,
        ))
    }

    /// Every item in log order
    pub fn items(&self) -> Result<Vec<RawLogItem>> {
        let inner = self.inner.read();
        inner
            .offsets
            .iter()
            .map(|&offset| Self::decode_at(&inner.bytes, offset as usize).map(|(item, _)| item))
            .collect()
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.inner.read().offsets.len()
    }

    /// True when nothing was appended
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total framed bytes
    pub fn total_bytes(&self) -> u64 {
        self.inner.read().bytes.len() as u64
    }

    /// LSN of the last item
    pub fn last_lsn(&self) -> Option<Lsn> {
        self.inner.read().offsets.last().map(|&o| Lsn::new(o))
    }

    #[cfg(test)]
    fn corrupt_byte(&self, offset: usize) {
        self.inner.write().bytes[offset] ^= 0xFF;
    }
}
