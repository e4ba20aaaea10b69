//! Injectable capture hook
//!
//! Passed to `BeforeImageRecordStore::with_hook` at construction. Invoked
//! before every capture; returning an error fails that capture before
//! anything is written. Used for fault injection in tests.

use std::fmt::Debug;

use strata_core::{Lsn, Result};

use super::CaptureCause;

/// Callback run before each before-image put
pub trait CaptureHook: Send + Sync + Debug {
    /// Called with the key and cause of the capture about to happen
    fn before_put(&self, abort_lsn: Lsn, cause: CaptureCause) -> Result<()>;
}
