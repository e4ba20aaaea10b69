//! Core types for the Strata before-image subsystem
//!
//! This crate defines the foundational types shared by storage, the log
//! format and replication:
//! - Timestamp: microsecond wall-clock instants
//! - Lsn: log positions, the key of every captured before-image
//! - Clock: injectable time source (system or manual)
//! - TtlDescriptor / ExpirationToken: relative TTL policy and its absolute packed form
//! - packed: variable-length integer and byte-array codec
//! - log_version: format versions that gate optional fields
//! - Error: error taxonomy, fatal vs propagated

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod contract;
pub mod error;
pub mod log_version;
pub mod packed;
pub mod ttl;

pub use clock::{Clock, ManualClock, SystemClock};
pub use contract::{Lsn, Timestamp};
pub use error::{Error, Result};
pub use log_version::{BEFORE_IMAGE_LOG_VERSION, CURRENT_LOG_VERSION, MIN_LOG_VERSION};
pub use ttl::{ExpirationToken, TimeUnit, TtlDescriptor};
