//! Day and time normalization for raw timetable input.
//!
//! Accepts full English day names (any case) and `HH:MM` / `HH:MM:SS` times.
//! All functions are pure.

use crate::error::{Result, ScheduleError};
use crate::types::{ClockTime, MINUTES_PER_DAY, SlotSpec, Weekday};

/// Maps a day token such as `"Tuesday"` or `" tuesday "` to a [`Weekday`].
pub fn parse_day_of_week(token: &str) -> Result<Weekday> {
    let key = token.trim();
    Weekday::ALL
        .into_iter()
        .find(|day| day.name().eq_ignore_ascii_case(key))
        .ok_or_else(|| {
            ScheduleError::invalid(format!(
                "Invalid day_of_week '{}'. Must be one of: Sunday, Monday, Tuesday, \
                 Wednesday, Thursday, Friday, Saturday",
                token
            ))
        })
}

/// Parses `H:MM`, `HH:MM` or `HH:MM:SS` into a [`ClockTime`].
pub fn parse_clock_time(token: &str) -> Result<ClockTime> {
    let format_error = || {
        ScheduleError::invalid(format!(
            "Invalid time '{}'. Expected HH:MM or HH:MM:SS",
            token
        ))
    };

    let parts: Vec<&str> = token.trim().split(':').collect();
    let (hour, minute, second) = match parts.as_slice() {
        [h, m] => (*h, *m, None),
        [h, m, s] => (*h, *m, Some(*s)),
        _ => return Err(format_error()),
    };

    let hour = parse_digits(hour, 1..=2).ok_or_else(format_error)?;
    let minute = parse_digits(minute, 2..=2).ok_or_else(format_error)?;
    let second = match second {
        Some(s) => parse_digits(s, 2..=2).ok_or_else(format_error)?,
        None => 0,
    };

    if hour > 23 || minute > 59 || second > 59 {
        return Err(ScheduleError::invalid(format!(
            "Invalid time '{}'. Hours 0-23, minutes/seconds 0-59",
            token
        )));
    }

    Ok(ClockTime {
        hour,
        minute,
        second,
    })
}

/// Minute of day for a time token, rounding non-zero seconds up.
pub fn parse_time_to_minutes(token: &str) -> Result<u16> {
    parse_clock_time(token).map(ClockTime::minute_of_day)
}

/// Normalizes a raw `(day, start, end)` triple into a [`SlotSpec`].
///
/// Zero-length intervals (after rounding) are rejected. An end earlier
/// than the start is kept as-is and means the slot crosses midnight.
pub fn normalize_slot(day_of_week: &str, start_time: &str, end_time: &str) -> Result<SlotSpec> {
    let spec = SlotSpec {
        day_of_week: parse_day_of_week(day_of_week)?,
        start_time: parse_clock_time(start_time)?,
        end_time: parse_clock_time(end_time)?,
    };

    // 23:59:xx rounds up to 1440, which is the same instant as 00:00
    let (start, end) = (spec.start_minute(), spec.end_minute());
    if start == end || (start == MINUTES_PER_DAY && end == 0) {
        return Err(ScheduleError::invalid(
            "Start time and end time cannot be the same",
        ));
    }

    Ok(spec)
}

fn parse_digits(s: &str, len: std::ops::RangeInclusive<usize>) -> Option<u8> {
    if !len.contains(&s.len()) || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
