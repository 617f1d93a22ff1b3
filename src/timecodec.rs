//! Conversions between local wall-clock time and the device's internal
//! time representation.
//!
//! The sockets keep their clock in UTC. Timer slots store an hour/minute
//! pair in that convention, absence-mode windows store 4-byte big-endian
//! seconds-since-epoch values, and weekly repeat cycles are packed into a
//! single byte with one bit per weekday.
//!
//! All conversions take an explicit delta in seconds (the amount added when
//! going from local to device time). [`TimeBasis::local`] captures the
//! caller's current UTC offset and wall clock so that decoding stays
//! deterministic when a fixed basis is supplied instead.
//!
//! # Example
//!
//! ```
//! use silvercrest_sws::timecodec::{pack_repeat_mask, unpack_repeat_mask, WEEKDAYS};
//!
//! let byte = pack_repeat_mask(WEEKDAYS);
//! assert_eq!(unpack_repeat_mask(byte), WEEKDAYS);
//! ```

use chrono::{DateTime, Datelike, Duration, Local, NaiveDateTime, NaiveTime, Offset, Timelike};

use crate::error::{Result, SwsError};

/// Seconds in a day, used for wrapping time-of-day arithmetic.
const SECONDS_PER_DAY: i64 = 86_400;

/// Repeat on every day of the week.
pub const EVERY_DAY: [bool; 7] = [true; 7];

/// Repeat Monday through Friday.
pub const WEEKDAYS: [bool; 7] = [true, true, true, true, true, false, false];

/// Never repeat; the timer fires once.
pub const ONCE: [bool; 7] = [false; 7];

/// Clock context for encoding and decoding device times.
///
/// `delta_seconds` is added when converting local time to device time (and
/// subtracted on the way back); `now` anchors countdown arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBasis {
    /// Seconds added when shifting local time to the device convention.
    pub delta_seconds: i32,
    /// Local wall-clock reference for countdown encoding/decoding.
    pub now: NaiveDateTime,
}

impl TimeBasis {
    /// Captures the current local clock and UTC offset.
    ///
    /// The device runs UTC, so the default delta is the number of seconds
    /// the local zone sits west of UTC (negative east of it).
    pub fn local() -> Self {
        let now: DateTime<Local> = Local::now();
        Self {
            delta_seconds: -now.offset().fix().local_minus_utc(),
            now: now.naive_local(),
        }
    }

    /// Captures the current local clock with a caller-supplied delta, for
    /// devices whose clock does not follow the UTC convention.
    pub fn with_delta(delta_seconds: i32) -> Self {
        Self {
            delta_seconds,
            now: Local::now().naive_local(),
        }
    }
}

/// Converts a local time-of-day to the device's hour/minute pair.
///
/// # Example
///
/// ```
/// use chrono::NaiveTime;
/// use silvercrest_sws::timecodec::to_device_time;
///
/// // Local zone one hour east of UTC: 13:25 local is 12:25 on the device.
/// let local = NaiveTime::from_hms_opt(13, 25, 0).unwrap();
/// assert_eq!(to_device_time(local, -3600), (12, 25));
/// ```
pub fn to_device_time(local: NaiveTime, delta_seconds: i32) -> (u8, u8) {
    let total = (i64::from(local.num_seconds_from_midnight()) + i64::from(delta_seconds))
        .rem_euclid(SECONDS_PER_DAY);
    ((total / 3600) as u8, ((total % 3600) / 60) as u8)
}

/// Converts a device hour/minute pair back to local time-of-day.
///
/// # Errors
///
/// Returns `MalformedReply` if the device fields are not a valid time.
pub fn from_device_time(hour: u8, minute: u8, delta_seconds: i32) -> Result<NaiveTime> {
    if hour > 23 || minute > 59 {
        return Err(SwsError::malformed_reply(format!(
            "device time {hour:02}:{minute:02} out of range"
        )));
    }
    let total = (i64::from(hour) * 3600 + i64::from(minute) * 60 - i64::from(delta_seconds))
        .rem_euclid(SECONDS_PER_DAY);
    NaiveTime::from_num_seconds_from_midnight_opt(total as u32, 0)
        .ok_or_else(|| SwsError::malformed_reply("device time does not map to a wall-clock time"))
}

/// Packs seven weekday flags (Monday first) into the wire byte.
///
/// Bit 0 is Monday through bit 6 Sunday; bit 7 is left clear for the
/// command builder, which uses it as the timer-active flag. An all-false
/// mask encodes a non-repeating timer that fires once.
pub fn pack_repeat_mask(days: [bool; 7]) -> u8 {
    days.iter()
        .enumerate()
        .fold(0u8, |byte, (weekday, &set)| {
            if set {
                byte | (1 << weekday)
            } else {
                byte
            }
        })
}

/// Unpacks the wire byte into seven weekday flags (Monday first).
///
/// Bit 7 carries the timer-active flag on the wire and is ignored here.
pub fn unpack_repeat_mask(byte: u8) -> [bool; 7] {
    let mut days = [false; 7];
    for (weekday, day) in days.iter_mut().enumerate() {
        *day = byte & (1 << weekday) != 0;
    }
    days
}

/// Packs a local date and time into the device's 4-byte big-endian
/// seconds-since-epoch field.
///
/// # Errors
///
/// Returns `TimeOutOfRange` if the instant does not fit in 32 bits, or
/// `InvalidParameter` if the local zone has no such wall-clock time
/// (spring-forward gap).
pub fn pack_timestamp(local: NaiveDateTime) -> Result<[u8; 4]> {
    let resolved = local
        .and_local_timezone(Local)
        .earliest()
        .ok_or_else(|| {
            SwsError::invalid_parameter(
                "time",
                format!(
                    "{}-{:02}-{:02} has no such local wall-clock time",
                    local.year(),
                    local.month(),
                    local.day()
                ),
            )
        })?;
    let seconds = resolved.timestamp();
    let packed =
        u32::try_from(seconds).map_err(|_| SwsError::TimeOutOfRange)?;
    Ok(packed.to_be_bytes())
}

/// Unpacks a 4-byte big-endian timestamp into a local date and time.
pub fn unpack_timestamp(bytes: [u8; 4]) -> Result<NaiveDateTime> {
    let seconds = u32::from_be_bytes(bytes);
    DateTime::from_timestamp(i64::from(seconds), 0)
        .map(|utc| utc.with_timezone(&Local).naive_local())
        .ok_or(SwsError::TimeOutOfRange)
}

/// Minutes remaining until a countdown slot fires, relative to `now`.
///
/// The device reports the expiry as a time-of-day; the remainder wraps
/// forward across midnight at minute granularity.
pub fn countdown_remaining(expiry: NaiveTime, now: NaiveTime) -> Duration {
    let expiry_minutes = i64::from(expiry.hour()) * 60 + i64::from(expiry.minute());
    let now_minutes = i64::from(now.hour()) * 60 + i64::from(now.minute());
    Duration::minutes((expiry_minutes - now_minutes).rem_euclid(24 * 60))
}
