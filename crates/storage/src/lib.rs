//! Storage layer for the before-image subsystem
//!
//! This crate holds both sides of the storage boundary:
//! - StorageEngine / InternalStore: the collaborator interface (create-or-open
//!   internal stores, no-overwrite puts, transaction scopes, clock)
//! - MemoryEngine: in-process engine with BTreeMap stores
//! - TxnContext: lock/transaction scope shared by a mutation and its capture
//! - before_image: payload format, enabled/disabled stores, entry cache, stats
//!
//! # Concurrency
//!
//! The before-image store handle is created once through `OnceCell`;
//! counters are independent atomics; the entry cache uses DashMap plus a
//! separately locked FIFO queue.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod before_image;
pub mod engine;
pub mod memory;
pub mod stored_value;
pub mod txn;

pub use before_image::{
    BeforeImageEntryCache, BeforeImagePayload, BeforeImagePayloadBuilder, BeforeImageRecordStore,
    BeforeImageStats, BeforeImageStore, CachedImage, CaptureCause, CaptureHook,
    NullBeforeImageRecordStore, DEFAULT_STORE_NAME,
};
pub use engine::{InternalStore, PutOutcome, StorageEngine};
pub use memory::{MemoryEngine, MemoryStore};
pub use stored_value::StoredValue;
pub use txn::{TxnContext, TxnParticipant};
