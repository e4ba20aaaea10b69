//! Before-image engine integration
//!
//! This crate wires the lower layers together:
//! - BeforeImageConfig: `beforeimage.toml`, read once at startup
//! - CaptureCoordinator: runs a mutation and its capture in one transaction
//!   and appends both to the log
//! - Feeder: ships logged mutations to a peer with their before-images

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod capture;
pub mod config;
pub mod feeder;

pub use capture::{cause_of, CaptureCoordinator, PriorVersion};
pub use config::{BeforeImageConfig, CONFIG_FILE_NAME};
pub use feeder::{Feeder, DEFAULT_WINDOW};
