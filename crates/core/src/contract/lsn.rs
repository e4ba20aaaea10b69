//! Log sequence numbers
//!
//! An `Lsn` is the position of a record version in the append-only log.
//! Before-images are keyed by the LSN of the version they preserve, so the
//! key encoding here is part of the durable format of the before-image
//! store: 8 bytes, big-endian, which keeps store order equal to log order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of an entry in the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Lsn(u64);

impl Lsn {
    /// Sentinel for "no position"
    pub const NULL: Lsn = Lsn(u64::MAX);

    /// Size of the encoded key form
    pub const KEY_SIZE: usize = 8;

    /// Wrap a raw log offset
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Lsn(raw)
    }

    /// Raw log offset
    #[inline]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// True for the `NULL` sentinel
    #[inline]
    pub const fn is_null(&self) -> bool {
        self.0 == u64::MAX
    }

    /// Store key for this LSN
    pub fn to_key_bytes(&self) -> [u8; Self::KEY_SIZE] {
        self.0.to_be_bytes()
    }

    /// Parse a store key, `None` if it is not exactly 8 bytes
    pub fn from_key_bytes(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; Self::KEY_SIZE] = bytes.try_into().ok()?;
        Some(Lsn(u64::from_be_bytes(raw)))
    }
}

impl fmt::Display for Lsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "NULL_LSN")
        } else {
            write!(f, "0x{:x}", self.0)
        }
    }
}

impl From<u64> for Lsn {
    fn from(raw: u64) -> Self {
        Lsn(raw)
    }
}
