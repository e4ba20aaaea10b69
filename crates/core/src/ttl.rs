//! Time-to-live descriptors and packed expiration tokens
//!
//! A `TtlDescriptor` is the relative policy a caller asks for (magnitude +
//! unit). The storage engine never persists it directly; it persists the
//! derived `ExpirationToken`, an absolute expiration counted in whole units
//! (hours or days) since the Unix epoch, rounded up to the next unit
//! boundary.
//!
//! Both types have a signed "packed" form used inside log entries: the
//! magnitude is negated when the unit is hours, so one signed varint carries
//! both the value and the unit flag.
//!
//! Magnitude 0 means "no TTL". It is always normalized to `DAYS`, so the
//! packed form round-trips exactly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::contract::Timestamp;
use crate::error::{Error, Result};

const MICROS_PER_HOUR: u64 = 3_600 * 1_000_000;
const MICROS_PER_DAY: u64 = 24 * MICROS_PER_HOUR;

/// Granularity of a TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    /// Whole hours
    Hours,
    /// Whole days
    Days,
}

impl TimeUnit {
    /// Length of one unit in microseconds
    #[inline]
    pub const fn as_micros(&self) -> u64 {
        match self {
            TimeUnit::Hours => MICROS_PER_HOUR,
            TimeUnit::Days => MICROS_PER_DAY,
        }
    }

    /// Length of one unit
    pub fn duration(&self) -> Duration {
        Duration::from_micros(self.as_micros())
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeUnit::Hours => write!(f, "HOURS"),
            TimeUnit::Days => write!(f, "DAYS"),
        }
    }
}

/// Requested expiration for a captured before-image
///
/// Immutable value built once per mutation. Inserts use
/// `TtlDescriptor::NONE`, which never materializes a before-image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TtlDescriptor {
    magnitude: u32,
    unit: TimeUnit,
}

impl TtlDescriptor {
    /// No TTL override
    pub const NONE: TtlDescriptor = TtlDescriptor {
        magnitude: 0,
        unit: TimeUnit::Days,
    };

    /// Build a descriptor; magnitude 0 collapses to `NONE`
    pub const fn new(magnitude: u32, unit: TimeUnit) -> Self {
        if magnitude == 0 {
            Self::NONE
        } else {
            TtlDescriptor { magnitude, unit }
        }
    }

    /// `magnitude` hours
    pub const fn hours(magnitude: u32) -> Self {
        Self::new(magnitude, TimeUnit::Hours)
    }

    /// `magnitude` days
    pub const fn days(magnitude: u32) -> Self {
        Self::new(magnitude, TimeUnit::Days)
    }

    /// User-specified magnitude
    #[inline]
    pub const fn magnitude(&self) -> u32 {
        self.magnitude
    }

    /// Unit of the magnitude
    #[inline]
    pub const fn unit(&self) -> TimeUnit {
        self.unit
    }

    /// True when no expiration was requested
    #[inline]
    pub const fn is_none(&self) -> bool {
        self.magnitude == 0
    }

    /// Relative lifetime, `None` for the no-TTL descriptor
    pub fn duration(&self) -> Option<Duration> {
        if self.is_none() {
            None
        } else {
            Some(Duration::from_micros(
                (self.magnitude as u64).saturating_mul(self.unit.as_micros()),
            ))
        }
    }

    /// Absolute expiration token for a capture taking place at `now`
    ///
    /// The result is rounded up to the next whole unit, so an entry never
    /// expires earlier than requested.
    pub fn logged_expiration_at(&self, now: Timestamp) -> ExpirationToken {
        if self.is_none() {
            return ExpirationToken::NEVER;
        }
        let unit = self.unit.as_micros();
        let target = now
            .as_micros()
            .saturating_add((self.magnitude as u64).saturating_mul(unit));
        let units = target / unit + u64::from(target % unit != 0);
        ExpirationToken::new(
            u32::try_from(units).unwrap_or(u32::MAX),
            self.unit == TimeUnit::Hours,
        )
    }

    /// Absolute expiration token relative to the wall clock
    pub fn logged_expiration(&self) -> ExpirationToken {
        self.logged_expiration_at(Timestamp::now())
    }

    /// Signed single-value form: negative magnitude means hours
    pub fn to_packed(&self) -> i64 {
        match self.unit {
            TimeUnit::Hours => -(self.magnitude as i64),
            TimeUnit::Days => self.magnitude as i64,
        }
    }

    /// Inverse of `to_packed`
    pub fn from_packed(packed: i64) -> Result<Self> {
        let magnitude = u32::try_from(packed.unsigned_abs()).map_err(|_| {
            Error::corruption(format!("TTL magnitude {} out of range", packed))
        })?;
        let unit = if packed < 0 {
            TimeUnit::Hours
        } else {
            TimeUnit::Days
        };
        Ok(Self::new(magnitude, unit))
    }
}

impl Default for TtlDescriptor {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Display for TtlDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.magnitude, self.unit)
    }
}

/// Absolute expiration in whole units since epoch
///
/// This is the engine's packed expiration: `value` hours (or days) after the
/// Unix epoch. `value == 0` never expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ExpirationToken {
    value: u32,
    in_hours: bool,
}

impl ExpirationToken {
    /// Token that never expires
    pub const NEVER: ExpirationToken = ExpirationToken {
        value: 0,
        in_hours: false,
    };

    /// Build a token; value 0 collapses to `NEVER`
    pub const fn new(value: u32, in_hours: bool) -> Self {
        if value == 0 {
            Self::NEVER
        } else {
            ExpirationToken { value, in_hours }
        }
    }

    /// Units since epoch
    #[inline]
    pub const fn value(&self) -> u32 {
        self.value
    }

    /// Whether the unit is hours (otherwise days)
    #[inline]
    pub const fn in_hours(&self) -> bool {
        self.in_hours
    }

    /// True for the never-expiring token
    #[inline]
    pub const fn is_never(&self) -> bool {
        self.value == 0
    }

    /// Instant at which the token expires
    pub fn expires_at(&self) -> Option<Timestamp> {
        if self.is_never() {
            return None;
        }
        let unit = if self.in_hours {
            TimeUnit::Hours
        } else {
            TimeUnit::Days
        };
        Some(Timestamp::from_micros(
            (self.value as u64).saturating_mul(unit.as_micros()),
        ))
    }

    /// Whether the token has expired as of `now`
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at().is_some_and(|at| now >= at)
    }

    /// Signed single-value form: negative value means hours
    pub fn to_packed(&self) -> i64 {
        if self.in_hours {
            -(self.value as i64)
        } else {
            self.value as i64
        }
    }

    /// Inverse of `to_packed`
    pub fn from_packed(packed: i64) -> Result<Self> {
        let value = u32::try_from(packed.unsigned_abs()).map_err(|_| {
            Error::corruption(format!("expiration {} out of range", packed))
        })?;
        Ok(Self::new(value, packed < 0))
    }
}
