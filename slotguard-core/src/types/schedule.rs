use serde::{Deserialize, Serialize};

use super::{
    ClockTime, CollegeId, CourseId, EnrollmentId, SemesterId, SlotId, StudentId, Weekday,
};

/// A student, as read from the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub college_id: CollegeId,
}

/// A course, as read from the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub code: String,
    pub college_id: CollegeId,
}

/// A validated weekly interval that is not yet attached to a stored slot.
///
/// `end_time` earlier than `start_time` means the interval crosses midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSpec {
    pub day_of_week: Weekday,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
}

impl SlotSpec {
    pub fn start_minute(&self) -> u16 {
        self.start_time.minute_of_day()
    }

    pub fn end_minute(&self) -> u16 {
        self.end_time.minute_of_day()
    }

    pub fn crosses_midnight(&self) -> bool {
        self.end_minute() < self.start_minute()
    }
}

/// One recurring weekly occupied interval attached to a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySlot {
    pub id: SlotId,
    pub course_id: CourseId,
    pub day_of_week: Weekday,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
}

impl WeeklySlot {
    pub fn spec(&self) -> SlotSpec {
        SlotSpec {
            day_of_week: self.day_of_week,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }

    pub fn start_minute(&self) -> u16 {
        self.start_time.minute_of_day()
    }

    pub fn end_minute(&self) -> u16 {
        self.end_time.minute_of_day()
    }
}

/// A slot waiting to be persisted; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSlot {
    pub course_id: CourseId,
    pub spec: SlotSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub id: EnrollmentId,
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub semester_id: SemesterId,
    /// Epoch milliseconds
    pub enrolled_at: u64,
}

/// An enrollment waiting to be committed as part of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEnrollment {
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub semester_id: SemesterId,
    pub enrolled_at: u64,
}

/// What a candidate interval clashed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConflictTarget {
    Slot(SlotId),
    Course(CourseId),
}

impl std::fmt::Display for ConflictTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictTarget::Slot(id) => write!(f, "slot {}", id),
            ConflictTarget::Course(id) => write!(f, "course {}", id),
        }
    }
}

/// Outcome of one conflict check. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictCheckResult {
    pub has_conflict: bool,
    pub conflicting_with: Option<ConflictTarget>,
}

impl ConflictCheckResult {
    pub fn clear() -> Self {
        Self {
            has_conflict: false,
            conflicting_with: None,
        }
    }

    pub fn conflict(target: ConflictTarget) -> Self {
        Self {
            has_conflict: true,
            conflicting_with: Some(target),
        }
    }
}
