//! Error taxonomy shared by the scheduling kernel and its storage backends.

use thiserror::Error;

use crate::types::{ConflictTarget, CourseId, SemesterId};

pub type Result<T> = std::result::Result<T, ScheduleError>;

/// Where a schedule clash was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictContext {
    /// Against another slot of the same course
    CourseTimetable,
    /// Between two courses of one enrollment request
    BetweenSelectedCourses,
    /// Between a requested course and one the student already takes
    WithExistingEnrollment,
}

impl std::fmt::Display for ConflictContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictContext::CourseTimetable => write!(f, "in course timetable"),
            ConflictContext::BetweenSelectedCourses => write!(f, "between selected courses"),
            ConflictContext::WithExistingEnrollment => write!(f, "with existing enrollment"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ScheduleError {
    /// Malformed day/time, empty course list, zero-length slot, foreign course
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("timetable clash detected {context}: overlaps {conflicting_with}")]
    ScheduleConflict {
        context: ConflictContext,
        conflicting_with: ConflictTarget,
    },

    #[error("student is already enrolled in courses {course_ids:?} for semester {semester_id}")]
    DuplicateEnrollment {
        course_ids: Vec<CourseId>,
        semester_id: SemesterId,
    },

    /// The lease could not be acquired within the retry budget; retry later
    #[error("lease on '{resource}' unavailable after {attempts} attempts")]
    LockUnavailable { resource: String, attempts: u32 },

    #[error("storage error: {0}")]
    Storage(String),
}

impl ScheduleError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ScheduleError::InvalidInput(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ScheduleError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Stable category string for callers and transports.
    pub fn code(&self) -> &'static str {
        match self {
            ScheduleError::InvalidInput(_) => "INVALID_INPUT",
            ScheduleError::NotFound { .. } => "NOT_FOUND",
            ScheduleError::ScheduleConflict { .. } => "SCHEDULE_CONFLICT",
            ScheduleError::DuplicateEnrollment { .. } => "DUPLICATE_ENROLLMENT",
            ScheduleError::LockUnavailable { .. } => "LOCK_UNAVAILABLE",
            ScheduleError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// True when the same request may succeed if simply retried later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ScheduleError::LockUnavailable { .. } | ScheduleError::Storage(_)
        )
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for ScheduleError {
    fn from(err: rusqlite::Error) -> Self {
        ScheduleError::Storage(err.to_string())
    }
}
