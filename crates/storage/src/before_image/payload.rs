//! Before-image payload: the durable value format of the before-image store
//!
//! # Layout
//!
//! ```text
//! ┌──────────────────┬───────────────────────────┬──────────────────────────┐
//! │ version (packed) │ image (nullable, len-pfx) │ modification time (pkd)  │
//! └──────────────────┴───────────────────────────┴──────────────────────────┘
//! ```
//!
//! Fields are never reordered. A field added in a later version is appended
//! after the last one and guarded by `version >= N` on both sides; readers
//! ignore trailing bytes they do not know about.

use strata_core::packed::{self, ByteReader};
use strata_core::{Result, Timestamp, BEFORE_IMAGE_LOG_VERSION};

/// Captured prior value of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeforeImagePayload {
    format_version: u32,
    image: Option<Vec<u8>>,
    modification_time: Timestamp,
}

impl BeforeImagePayload {
    /// Start building a payload
    pub fn builder() -> BeforeImagePayloadBuilder {
        BeforeImagePayloadBuilder::default()
    }

    /// Format version the payload was written with
    #[inline]
    pub fn format_version(&self) -> u32 {
        self.format_version
    }

    /// Prior value bytes, `None` when the prior version had no data
    #[inline]
    pub fn image(&self) -> Option<&[u8]> {
        self.image.as_deref()
    }

    /// Modification time of the prior version
    #[inline]
    pub fn modification_time(&self) -> Timestamp {
        self.modification_time
    }

    /// Encoded size in bytes
    pub fn marshaled_len(&self) -> usize {
        packed::u64_len(self.format_version as u64)
            + packed::byte_array_len(self.image.as_deref())
            + packed::u64_len(self.modification_time.as_micros())
    }

    /// Encode to bytes
    pub fn marshal(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.marshaled_len());
        packed::write_u64(&mut buf, self.format_version as u64);
        packed::write_byte_array(&mut buf, self.image.as_deref());
        packed::write_u64(&mut buf, self.modification_time.as_micros());
        buf
    }

    /// Decode from bytes, tolerating trailing fields of later versions
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);
        let format_version = reader.read_u32()?;
        let image = reader.read_byte_array()?;
        let modification_time = Timestamp::from_micros(reader.read_u64()?);
        Ok(BeforeImagePayload {
            format_version,
            image,
            modification_time,
        })
    }

    /// Decode; absent input decodes to absent
    pub fn unmarshal(bytes: Option<&[u8]>) -> Result<Option<Self>> {
        bytes.map(Self::from_bytes).transpose()
    }
}

/// Builder for `BeforeImagePayload`
///
/// `build()` fills in `BEFORE_IMAGE_LOG_VERSION` when no version was set,
/// so call sites need not know the constant.
#[derive(Debug, Default, Clone)]
pub struct BeforeImagePayloadBuilder {
    format_version: Option<u32>,
    image: Option<Vec<u8>>,
    modification_time: Timestamp,
}

impl BeforeImagePayloadBuilder {
    /// Set the format version
    pub fn format_version(mut self, version: u32) -> Self {
        self.format_version = Some(version);
        self
    }

    /// Set the prior value bytes
    pub fn image(mut self, image: impl Into<Vec<u8>>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Set the modification time of the prior version
    pub fn modification_time(mut self, ts: Timestamp) -> Self {
        self.modification_time = ts;
        self
    }

    /// Finish the payload
    pub fn build(self) -> BeforeImagePayload {
        BeforeImagePayload {
            format_version: self
                .format_version
                .unwrap_or(BEFORE_IMAGE_LOG_VERSION as u32),
            image: self.image,
            modification_time: self.modification_time,
        }
    }
}
