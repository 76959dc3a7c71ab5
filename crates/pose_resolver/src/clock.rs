//! Host tick to absolute tick conversion
//!
//! Absolute ticks are 100 ns units since 1601-01-01 UTC, so a receiver can
//! place every frame on the wall clock regardless of the device's boot time.

use chrono::{DateTime, Utc};
use contracts::{ContractError, TICKS_PER_SECOND};

/// Absolute ticks at 1970-01-01 UTC
pub const FILETIME_UNIX_EPOCH_TICKS: i64 = 116_444_736_000_000_000;

/// Rescale a tick count at `ticks_per_second` to 100 ns units
///
/// Saturates at `u64::MAX`; a zero rate is treated as 1 Hz.
pub fn to_hundreds_of_nanos(ticks: u64, ticks_per_second: u64) -> u64 {
    if ticks_per_second == TICKS_PER_SECOND {
        return ticks;
    }
    let scaled =
        u128::from(ticks) * u128::from(TICKS_PER_SECOND) / u128::from(ticks_per_second.max(1));
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

/// Converts device-relative ticks into absolute ticks
///
/// Both sides are in 100 ns units; callers rescale the device counter with
/// [`to_hundreds_of_nanos`] first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampConverter {
    /// Absolute ticks at device tick zero
    offset_ticks: i64,
}

impl TimestampConverter {
    /// Converter with a fixed offset
    pub fn new(offset_ticks: i64) -> Self {
        Self { offset_ticks }
    }

    /// Converter anchored to the wall clock
    ///
    /// `now_ticks` is the device time (100 ns units) read at about the same
    /// instant as the wall clock.
    pub fn anchored(now_ticks: u64) -> Self {
        Self::anchored_at(Utc::now(), now_ticks)
    }

    /// Converter anchored to a given wall-clock instant
    pub fn anchored_at(now: DateTime<Utc>, now_ticks: u64) -> Self {
        let now_absolute = datetime_to_absolute_ticks(now);
        let now_relative = i64::try_from(now_ticks).unwrap_or(i64::MAX);
        Self::new(now_absolute.saturating_sub(now_relative))
    }

    pub fn offset_ticks(&self) -> i64 {
        self.offset_ticks
    }

    /// Device ticks (100 ns units) to absolute ticks
    ///
    /// # Errors
    /// The result must fall inside `0..=u64::MAX`.
    pub fn relative_to_absolute(&self, ticks: u64) -> Result<u64, ContractError> {
        let absolute = i128::from(ticks) + i128::from(self.offset_ticks);
        u64::try_from(absolute).map_err(|_| {
            ContractError::timestamp(format!(
                "ticks {ticks} with offset {} fall outside the absolute range",
                self.offset_ticks
            ))
        })
    }
}

/// Wall-clock instant to absolute ticks
pub fn datetime_to_absolute_ticks(at: DateTime<Utc>) -> i64 {
    let unix_ticks = at.timestamp() * TICKS_PER_SECOND as i64
        + i64::from(at.timestamp_subsec_nanos() / 100);
    FILETIME_UNIX_EPOCH_TICKS.saturating_add(unix_ticks)
}

/// Absolute ticks back to a wall-clock instant
pub fn absolute_ticks_to_datetime(ticks: u64) -> Option<DateTime<Utc>> {
    let unix_ticks = i64::try_from(ticks).ok()? - FILETIME_UNIX_EPOCH_TICKS;
    let secs = unix_ticks.div_euclid(TICKS_PER_SECOND as i64);
    let nanos = (unix_ticks.rem_euclid(TICKS_PER_SECOND as i64) * 100) as u32;
    DateTime::from_timestamp(secs, nanos)
}
