//! Integration tests for before-image capture.
//!
//! These tests drive the full path: a mutation captured inside its
//! transaction, the log entries it produces, and the wire records a feeder
//! ships for it. Encoding details are covered by the unit tests inside each
//! crate.

#[path = "../common/mod.rs"]
mod common;

mod disabled;
mod expiry;
mod hooks;
mod no_overwrite;
mod properties;
mod scenarios;
mod utilization;
