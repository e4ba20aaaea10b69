//! Error types for the before-image subsystem
//!
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Two classes of failure are distinguished:
//! - internal-consistency failures (`is_fatal() == true`): a protocol or
//!   sequencing bug in the calling layer. These are never retried and never
//!   swallowed.
//! - propagated failures (I/O, configuration): passed through unchanged.
//!
//! A disabled feature is not an error at all; it shows up as `Ok(false)` or
//! `Ok(None)`.

use crate::contract::Lsn;
use std::io;
use thiserror::Error;

/// Result type alias for before-image operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the before-image subsystem
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the underlying storage engine
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Bytes could not be decoded
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// Buffer ended before a complete field could be read
    #[error("Insufficient data: needed {needed} bytes, have {have}")]
    InsufficientData {
        /// Bytes required to finish the read
        needed: usize,
        /// Bytes available
        have: usize,
    },

    /// Log entry type does not carry before-image fields
    #[error("Log entry type 0x{entry_type:02X} does not support before-images")]
    UnsupportedEntryType {
        /// Raw entry type byte
        entry_type: u8,
    },

    /// Log format version outside the supported range
    #[error("Unsupported log version: {0}")]
    UnsupportedVersion(u8),

    /// Computed size and written length disagree
    #[error("Size mismatch: computed {expected} bytes, wrote {actual}")]
    SizeMismatch {
        /// Size reported by `size()`
        expected: usize,
        /// Bytes actually produced by `write()`
        actual: usize,
    },

    /// A before-image was captured twice for the same LSN
    #[error("Before-image already captured for abort LSN {lsn}")]
    DuplicateBeforeImage {
        /// LSN of the superseded version
        lsn: Lsn,
    },

    /// The before-image store was read before it was ever created
    #[error("Before-image store accessed before creation")]
    StoreNotCreated,

    /// The before-image store was used after `close()`
    #[error("Before-image store is closed")]
    StoreClosed,

    /// Configuration could not be loaded or is inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Whether this error signals an internal inconsistency
    ///
    /// Fatal errors indicate corruption, version skew or a caller
    /// sequencing bug. They must abort the enclosing operation.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Corruption(_)
                | Error::InsufficientData { .. }
                | Error::UnsupportedEntryType { .. }
                | Error::UnsupportedVersion(_)
                | Error::SizeMismatch { .. }
                | Error::DuplicateBeforeImage { .. }
                | Error::StoreNotCreated
        )
    }

    /// Shorthand for a `Corruption` error
    pub fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }
}
