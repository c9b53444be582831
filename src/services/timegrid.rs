//! Clock-time grid helpers. Times are minutes since midnight; the wire form
//! is a zero-padded `HH:MM` string.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed clock time: {0:?} (expected HH:MM)")]
pub struct MalformedTime(pub String);

/// Parses a strict `HH:MM` clock time into minutes since midnight.
pub fn to_minutes(clock: &str) -> Result<i32, MalformedTime> {
    let malformed = || MalformedTime(clock.to_string());

    let (hour_str, minute_str) = clock.split_once(':').ok_or_else(malformed)?;
    if hour_str.len() != 2
        || minute_str.len() != 2
        || !hour_str.chars().all(|c| c.is_ascii_digit())
        || !minute_str.chars().all(|c| c.is_ascii_digit())
    {
        return Err(malformed());
    }

    let hour: i32 = hour_str.parse().map_err(|_| malformed())?;
    let minute: i32 = minute_str.parse().map_err(|_| malformed())?;
    if hour > 23 || minute > 59 {
        return Err(malformed());
    }

    Ok(hour * 60 + minute)
}

/// Formats minutes since midnight as `HH:MM`. The caller keeps minutes
/// within [0, 1440); no wrapping is performed.
pub fn to_clock_time(minutes: i32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

pub fn is_aligned(minutes: i32, interval_minutes: i32) -> bool {
    interval_minutes > 0 && minutes % interval_minutes == 0
}
