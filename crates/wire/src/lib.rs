//! Replication side of the before-image subsystem
//!
//! Turns log items into `ReplicationWireRecord`s: the replicable form of
//! the mutation plus its before-image, resolved once per item and never
//! shipped after it expires.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod log_item;
pub mod record;

pub use log_item::{BeforeImageMemo, LogItem};
pub use record::ReplicationWireRecord;
