//! Versioned mutation log entry
//!
//! A mutation entry plus the before-image TTL, appended after the base
//! fields. The TTL is written as one signed packed value (negative
//! magnitude means hours) and only exists when the format version is at
//! least `BEFORE_IMAGE_LOG_VERSION`:
//!
//! | Version | Before-image TTL |
//! |---------|------------------|
//! | `< BEFORE_IMAGE_LOG_VERSION` | not written, decodes as `TtlDescriptor::NONE` |
//! | `>= BEFORE_IMAGE_LOG_VERSION` | packed signed magnitude |
//!
//! `size(v)` and `write(v)` evaluate the same gate; `write` checks that the
//! bytes it produced match `size` and fails with `SizeMismatch` otherwise.

use strata_core::log_version::{check_supported, has_before_image};
use strata_core::packed::{self, ByteReader};
use strata_core::{Error, Result, TtlDescriptor};

use crate::entry_type::LogEntryType;
use crate::mutation::MutationLogEntry;

/// Mutation entry carrying a before-image TTL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedMutationLogEntry {
    entry_type: LogEntryType,
    base: MutationLogEntry,
    before_image_ttl: TtlDescriptor,
}

impl VersionedMutationLogEntry {
    /// Create an entry; fails for types that do not carry before-image fields
    pub fn new(
        entry_type: LogEntryType,
        base: MutationLogEntry,
        before_image_ttl: TtlDescriptor,
    ) -> Result<Self> {
        if !entry_type.supports_before_image() {
            return Err(Error::UnsupportedEntryType {
                entry_type: entry_type.into(),
            });
        }
        Ok(VersionedMutationLogEntry {
            entry_type,
            base,
            before_image_ttl,
        })
    }

    /// Entry type
    pub fn entry_type(&self) -> LogEntryType {
        self.entry_type
    }

    /// Base mutation fields
    pub fn base(&self) -> &MutationLogEntry {
        &self.base
    }

    /// Consume into the base fields
    pub fn into_base(self) -> MutationLogEntry {
        self.base
    }

    /// Before-image TTL (`NONE` when no image was captured)
    pub fn before_image_ttl(&self) -> TtlDescriptor {
        self.before_image_ttl
    }

    fn ttl_len(&self, version: u8) -> usize {
        if has_before_image(version) {
            packed::i64_len(self.before_image_ttl.to_packed())
        } else {
            0
        }
    }

    fn write_ttl(&self, buf: &mut Vec<u8>, version: u8) {
        if has_before_image(version) {
            packed::write_i64(buf, self.before_image_ttl.to_packed());
        }
    }

    fn read_ttl(reader: &mut ByteReader<'_>, version: u8) -> Result<TtlDescriptor> {
        if has_before_image(version) {
            TtlDescriptor::from_packed(reader.read_i64()?)
        } else {
            Ok(TtlDescriptor::NONE)
        }
    }

    fn checked_write(
        buf: &mut Vec<u8>,
        expected: usize,
        write: impl FnOnce(&mut Vec<u8>),
    ) -> Result<()> {
        let start = buf.len();
        write(buf);
        let actual = buf.len() - start;
        if actual != expected {
            buf.truncate(start);
            return Err(Error::SizeMismatch { expected, actual });
        }
        Ok(())
    }

    fn checked_type(entry_type: u8) -> Result<LogEntryType> {
        let entry_type = LogEntryType::try_from(entry_type)?;
        if !entry_type.supports_before_image() {
            return Err(Error::UnsupportedEntryType {
                entry_type: entry_type.into(),
            });
        }
        Ok(entry_type)
    }

    /// Encoded size of the log form at `version`
    pub fn size(&self, version: u8) -> Result<usize> {
        check_supported(version)?;
        Ok(self.base.log_size() + self.ttl_len(version))
    }

    /// Append the log form at `version`
    pub fn write(&self, buf: &mut Vec<u8>, version: u8) -> Result<()> {
        let expected = self.size(version)?;
        Self::checked_write(buf, expected, |buf| {
            self.base.write_log(buf);
            self.write_ttl(buf, version);
        })
    }

    /// Decode the log form of an entry of raw type `entry_type`
    ///
    /// Fails with `UnsupportedEntryType` for types without before-image
    /// support and rejects trailing bytes.
    pub fn read(entry_type: u8, bytes: &[u8], version: u8) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);
        let entry = Self::read_log_from(entry_type, &mut reader, version)?;
        if !reader.is_empty() {
            return Err(Error::corruption(format!(
                "{} trailing bytes after log entry",
                reader.remaining()
            )));
        }
        Ok(entry)
    }

    /// Decode the log form from a reader
    pub fn read_log_from(entry_type: u8, reader: &mut ByteReader<'_>, version: u8) -> Result<Self> {
        check_supported(version)?;
        let entry_type = Self::checked_type(entry_type)?;
        let base = MutationLogEntry::read_log(reader)?;
        let before_image_ttl = Self::read_ttl(reader, version)?;
        Ok(VersionedMutationLogEntry {
            entry_type,
            base,
            before_image_ttl,
        })
    }

    /// Encoded size of the replicable form at `version`
    pub fn replicable_size(&self, version: u8) -> Result<usize> {
        check_supported(version)?;
        Ok(self.base.replicable_size() + self.ttl_len(version))
    }

    /// Append the replicable form at `version`
    pub fn write_replicable(&self, buf: &mut Vec<u8>, version: u8) -> Result<()> {
        let expected = self.replicable_size(version)?;
        Self::checked_write(buf, expected, |buf| {
            self.base.write_replicable(buf);
            self.write_ttl(buf, version);
        })
    }

    /// Decode the replicable form from a reader, leaving any following bytes
    pub fn read_replicable_from(
        entry_type: u8,
        reader: &mut ByteReader<'_>,
        version: u8,
    ) -> Result<Self> {
        check_supported(version)?;
        let entry_type = Self::checked_type(entry_type)?;
        let base = MutationLogEntry::read_replicable(reader)?;
        let before_image_ttl = Self::read_ttl(reader, version)?;
        Ok(VersionedMutationLogEntry {
            entry_type,
            base,
            before_image_ttl,
        })
    }

    /// Equality of everything the replicable form at `version` carries
    pub fn matches_replicated(&self, other: &VersionedMutationLogEntry, version: u8) -> bool {
        self.entry_type == other.entry_type
            && self.base.matches_replicated(&other.base)
            && (!has_before_image(version) || self.before_image_ttl == other.before_image_ttl)
    }
}
