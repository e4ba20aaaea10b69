//! Log item framing
//!
//! # Layout
//!
//! ```text
//! ┌──────────┬─────────────┬─────────────────────┬──────────────┬────────────────┐
//! │ Type (1) │ Version (1) │ Item size (4, BE)   │ LSN (8, BE)  │ Body (size)    │
//! └──────────┴─────────────┴─────────────────────┴──────────────┴────────────────┘
//! ```
//!
//! The same framing is used in the log and on the replication wire.

use byteorder::{BigEndian, ByteOrder};

use strata_core::{Error, Lsn, Result};

use crate::entry_type::LogEntryType;

/// Size of an encoded header in bytes
pub const LOG_ENTRY_HEADER_SIZE: usize = 14;

/// Header preceding every log item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogEntryHeader {
    /// Raw entry type byte
    pub entry_type: u8,
    /// Format version the body was written with
    pub version: u8,
    /// Body length in bytes
    pub item_size: u32,
    /// Log position of the item
    pub lsn: Lsn,
}

impl LogEntryHeader {
    /// Create a header
    pub fn new(entry_type: LogEntryType, version: u8, item_size: u32, lsn: Lsn) -> Self {
        LogEntryHeader {
            entry_type: entry_type.into(),
            version,
            item_size,
            lsn,
        }
    }

    /// Decoded entry type
    pub fn log_entry_type(&self) -> Result<LogEntryType> {
        Ok(LogEntryType::try_from(self.entry_type)?)
    }

    /// Append the encoded header to `buf`
    pub fn write(&self, buf: &mut Vec<u8>) {
        let mut bytes = [0u8; LOG_ENTRY_HEADER_SIZE];
        bytes[0] = self.entry_type;
        bytes[1] = self.version;
        BigEndian::write_u32(&mut bytes[2..6], self.item_size);
        BigEndian::write_u64(&mut bytes[6..14], self.lsn.as_u64());
        buf.extend_from_slice(&bytes);
    }

    /// Decode a header from the front of `bytes`
    pub fn read(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < LOG_ENTRY_HEADER_SIZE {
            return Err(Error::InsufficientData {
                needed: LOG_ENTRY_HEADER_SIZE,
                have: bytes.len(),
            });
        }
        Ok(LogEntryHeader {
            entry_type: bytes[0],
            version: bytes[1],
            item_size: BigEndian::read_u32(&bytes[2..6]),
            lsn: Lsn::new(BigEndian::read_u64(&bytes[6..14])),
        })
    }
}
