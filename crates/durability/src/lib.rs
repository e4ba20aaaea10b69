//! Log format for mutations and their before-images
//!
//! This crate owns the bytes that go into the log:
//!
//! - Entry types: control vs mutation registry
//! - Framing: `(type, version, item size, LSN)` header
//! - MutationLogEntry: base fields, in log and replicable form
//! - VersionedMutationLogEntry: base plus the version-gated before-image TTL
//! - LogBuffer: in-memory append-only log, LSN = byte offset
//! - UtilizationScanner: offline before-image live/expired byte totals

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod entry_type;
pub mod header;
pub mod log_buffer;
pub mod mutation;
pub mod scanner;
pub mod versioned;

pub use entry_type::{LogEntryType, LogEntryTypeError};
pub use header::{LogEntryHeader, LOG_ENTRY_HEADER_SIZE};
pub use log_buffer::{LogBuffer, RawLogItem};
pub use mutation::{MutationLogEntry, BEFORE_IMAGE_DB_ID};
pub use scanner::{UtilizationReport, UtilizationScanner};
pub use versioned::VersionedMutationLogEntry;
