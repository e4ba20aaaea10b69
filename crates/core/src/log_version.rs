//! Log format versions
//!
//! Both the mutation log entry and the before-image payload gate their
//! optional fields on these numbers. A field introduced at version `N` is
//! written and read only when the declared version is `>= N`.

use crate::error::{Error, Result};

/// Oldest log version this build can read
pub const MIN_LOG_VERSION: u8 = 1;

/// Version that introduced before-image capture
pub const BEFORE_IMAGE_LOG_VERSION: u8 = 3;

/// Version written by this build
pub const CURRENT_LOG_VERSION: u8 = 3;

/// Reject versions outside `[MIN_LOG_VERSION, CURRENT_LOG_VERSION]`
pub fn check_supported(version: u8) -> Result<()> {
    if (MIN_LOG_VERSION..=CURRENT_LOG_VERSION).contains(&version) {
        Ok(())
    } else {
        Err(Error::UnsupportedVersion(version))
    }
}

/// Whether entries at `version` carry before-image fields
#[inline]
pub fn has_before_image(version: u8) -> bool {
    version >= BEFORE_IMAGE_LOG_VERSION
}
