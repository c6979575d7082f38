//! Splits weekly intervals into canonical same-day segments.

use smallvec::{SmallVec, smallvec};

use crate::error::{Result, ScheduleError};
use crate::types::{MINUTES_PER_DAY, SlotSpec, Weekday};

/// A half-open `[start, end)` range of minutes on a single weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Segment {
    pub day: Weekday,
    pub start: u16,
    pub end: u16,
}

impl Segment {
    pub fn new(day: Weekday, start: u16, end: u16) -> Self {
        Self { day, start, end }
    }

    /// Half-open intersection on the same weekday. Touching ends do not overlap.
    pub fn overlaps(&self, other: &Segment) -> bool {
        self.day == other.day && !(self.end <= other.start || other.end <= self.start)
    }
}

/// At most two segments per interval.
pub type Segments = SmallVec<[Segment; 2]>;

/// Splits `[start, end)` on `day` into one or two segments.
///
/// An interval whose end precedes its start crosses midnight and becomes
/// `[start, 1440)` on `day` plus `[0, end)` on the following day.
pub fn split(day: Weekday, start: u16, end: u16) -> Result<Segments> {
    if start == end {
        return Err(ScheduleError::invalid(
            "Start time and end time cannot be the same",
        ));
    }

    if start < end {
        return Ok(smallvec![Segment::new(day, start, end)]);
    }

    Ok(smallvec![
        Segment::new(day, start, MINUTES_PER_DAY),
        Segment::new(day.next(), 0, end),
    ])
}

/// Segments of a normalized slot.
pub fn segments_of(spec: &SlotSpec) -> Result<Segments> {
    split(spec.day_of_week, spec.start_minute(), spec.end_minute())
}
