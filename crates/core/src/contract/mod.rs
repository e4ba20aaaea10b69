//! Contract types shared by every layer
//!
//! - `timestamp`: microsecond wall-clock instants
//! - `lsn`: log positions, the address of a record version in the log

pub mod lsn;
pub mod timestamp;

pub use lsn::Lsn;
pub use timestamp::Timestamp;
