//! Log entry type registry
//!
//! Entry types are organized by ranges:
//!
//! | Range | Kind | Description |
//! |-------|------|-------------|
//! | 0x00-0x0F | Control | Transaction boundaries, checkpoints |
//! | 0x10-0x1F | Mutation | Record mutations (versioned, may carry a before-image TTL) |
//! | 0x20-0xFF | Reserved | Future entry kinds |
//!
//! Every mutation type is encoded as a `VersionedMutationLogEntry`. Reading
//! a control entry as a mutation is a protocol violation.

use thiserror::Error;

/// Log entry types with explicit byte values
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogEntryType {
    // ========================================================================
    // Control (0x00-0x0F)
    // ========================================================================
    /// Transaction commit marker
    TxnCommit = 0x00,

    /// Transaction abort marker
    TxnAbort = 0x01,

    /// Checkpoint boundary
    Checkpoint = 0x02,

    // ========================================================================
    // Mutations (0x10-0x1F)
    // ========================================================================
    /// New record; never supersedes a version
    Insert = 0x10,

    /// Value replaced
    Update = 0x11,

    /// Record deleted
    Delete = 0x12,

    /// Logical delete that must still replicate
    Tombstone = 0x13,
}

impl LogEntryType {
    /// Transaction boundary or checkpoint
    pub fn is_control(&self) -> bool {
        (*self as u8) < 0x10
    }

    /// Whether entries of this type use the versioned mutation format
    /// that carries before-image fields
    pub fn supports_before_image(&self) -> bool {
        !self.is_control()
    }

    /// Whether a mutation of this type supersedes a prior version
    pub fn supersedes(&self) -> bool {
        matches!(
            self,
            LogEntryType::Update | LogEntryType::Delete | LogEntryType::Tombstone
        )
    }

    /// Category name for a raw type byte
    pub fn range_name(value: u8) -> &'static str {
        match value {
            0x00..=0x0F => "Control",
            0x10..=0x1F => "Mutation",
            _ => "Reserved",
        }
    }
}

/// Error when parsing a log entry type
#[derive(Debug, Error)]
pub enum LogEntryTypeError {
    /// Unknown value inside an allocated range
    #[error("Unknown log entry type: 0x{value:02X} (range: {range})")]
    UnknownEntryType {
        /// The unknown byte value
        value: u8,
        /// The range this value belongs to
        range: &'static str,
    },

    /// Value in a reserved range
    #[error("Log entry type 0x{value:02X} is in reserved range")]
    ReservedEntryType {
        /// The reserved byte value
        value: u8,
    },
}

impl TryFrom<u8> for LogEntryType {
    type Error = LogEntryTypeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(LogEntryType::TxnCommit),
            0x01 => Ok(LogEntryType::TxnAbort),
            0x02 => Ok(LogEntryType::Checkpoint),

            0x10 => Ok(LogEntryType::Insert),
            0x11 => Ok(LogEntryType::Update),
            0x12 => Ok(LogEntryType::Delete),
            0x13 => Ok(LogEntryType::Tombstone),

            0x20..=0xFF => Err(LogEntryTypeError::ReservedEntryType { value }),
            _ => Err(LogEntryTypeError::UnknownEntryType {
                value,
                range: LogEntryType::range_name(value),
            }),
        }
    }
}

impl From<LogEntryType> for u8 {
    fn from(entry_type: LogEntryType) -> Self {
        entry_type as u8
    }
}

impl From<LogEntryTypeError> for strata_core::Error {
    fn from(err: LogEntryTypeError) -> Self {
        let entry_type = match err {
            LogEntryTypeError::UnknownEntryType { value, .. } => value,
            LogEntryTypeError::ReservedEntryType { value } => value,
        };
        strata_core::Error::UnsupportedEntryType { entry_type }
    }
}
