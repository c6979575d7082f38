use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::conflict::ConflictEngine;
use crate::error::{ConflictContext, Result, ScheduleError};
use crate::segment::{Segment, Segments, segments_of};
use crate::types::{
    ConflictTarget, Course, CourseId, EnrollmentRecord, SemesterId, SlotId, SlotSpec, Student,
    StudentId, WeeklySlot,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentRequest {
    pub student_id: StudentId,
    pub course_ids: Vec<CourseId>,
    pub semester_id: SemesterId,
}

/// Everything read from the record store that an enrollment decision needs.
#[derive(Debug, Clone)]
pub struct EnrollmentSnapshot {
    pub student: Student,
    /// Courses found for the requested ids
    pub courses: Vec<Course>,
    /// The student's enrollments for the requested semester
    pub existing_enrollments: Vec<EnrollmentRecord>,
    /// Slots of every requested course
    pub requested_slots: Vec<WeeklySlot>,
    /// Slots of every already-enrolled course
    pub existing_slots: Vec<WeeklySlot>,
}

pub struct ScheduleValidator;

impl ScheduleValidator {
    /// Fails with `ScheduleConflict` if `candidate` clashes with any sibling slot.
    pub fn check_slot(
        candidate: &SlotSpec,
        siblings: &[WeeklySlot],
        exclude: Option<SlotId>,
    ) -> Result<()> {
        let result = ConflictEngine::check(candidate, siblings, exclude)?;
        match result.conflicting_with {
            Some(target) if result.has_conflict => Err(ScheduleError::ScheduleConflict {
                context: ConflictContext::CourseTimetable,
                conflicting_with: target,
            }),
            _ => Ok(()),
        }
    }

    /// Rejects a request naming no course at all.
    pub fn require_courses(request: &EnrollmentRequest) -> Result<()> {
        if request.course_ids.is_empty() {
            return Err(ScheduleError::invalid("At least one course must be provided"));
        }
        Ok(())
    }

    /// Rejects empty requests and course ids repeated within one request.
    pub fn check_request(request: &EnrollmentRequest) -> Result<()> {
        Self::require_courses(request)?;

        let mut seen = HashSet::new();
        let mut repeated: Vec<CourseId> = request
            .course_ids
            .iter()
            .copied()
            .filter(|id| !seen.insert(*id))
            .collect();
        if !repeated.is_empty() {
            repeated.sort_unstable();
            repeated.dedup();
            return Err(ScheduleError::DuplicateEnrollment {
                course_ids: repeated,
                semester_id: request.semester_id.clone(),
            });
        }

        Ok(())
    }

    /// Runs every enrollment rule against a snapshot, in order: request
    /// shape, course ownership, duplicates, clashes among the requested
    /// courses, clashes with the existing schedule.
    pub fn check_enrollment(snapshot: &EnrollmentSnapshot, request: &EnrollmentRequest) -> Result<()> {
        Self::check_request(request)?;

        let found: HashSet<CourseId> = snapshot.courses.iter().map(|c| c.id).collect();
        let missing: Vec<CourseId> = request
            .course_ids
            .iter()
            .copied()
            .filter(|id| !found.contains(id))
            .collect();
        if !missing.is_empty() {
            return Err(ScheduleError::invalid(format!(
                "One or more courses not found: {:?}",
                missing
            )));
        }

        if snapshot
            .courses
            .iter()
            .any(|c| c.college_id != snapshot.student.college_id)
        {
            return Err(ScheduleError::invalid(
                "All courses must belong to the same college as the student",
            ));
        }

        let mut already: Vec<CourseId> = snapshot
            .existing_enrollments
            .iter()
            .map(|e| e.course_id)
            .filter(|id| request.course_ids.contains(id))
            .collect();
        if !already.is_empty() {
            already.sort_unstable();
            already.dedup();
            return Err(ScheduleError::DuplicateEnrollment {
                course_ids: already,
                semester_id: request.semester_id.clone(),
            });
        }

        let requested = Self::segments_by_course(&snapshot.requested_slots)?;
        let courses: Vec<_> = requested.iter().collect();
        for (i, (course_a, segments_a)) in courses.iter().enumerate() {
            for (course_b, segments_b) in &courses[i + 1..] {
                if ConflictEngine::overlaps(segments_a, segments_b) {
                    tracing::debug!(course_a = **course_a, course_b = **course_b, "selected courses clash");
                    return Err(ScheduleError::ScheduleConflict {
                        context: ConflictContext::BetweenSelectedCourses,
                        conflicting_with: ConflictTarget::Course(**course_b),
                    });
                }
            }
        }

        let existing = Self::segments_by_course(&snapshot.existing_slots)?;
        for (held_course, held_segments) in &existing {
            for segments in requested.values() {
                if ConflictEngine::overlaps(held_segments, segments) {
                    return Err(ScheduleError::ScheduleConflict {
                        context: ConflictContext::WithExistingEnrollment,
                        conflicting_with: ConflictTarget::Course(*held_course),
                    });
                }
            }
        }

        Ok(())
    }

    /// Flattens each course's slots into one segment list, keyed by course
    /// in ascending id order.
    fn segments_by_course(slots: &[WeeklySlot]) -> Result<BTreeMap<CourseId, Vec<Segment>>> {
        let mut by_course: BTreeMap<CourseId, Vec<_>> = BTreeMap::new();
        for slot in slots {
            let segments: Segments = segments_of(&slot.spec())?;
            by_course.entry(slot.course_id).or_default().extend(segments);
        }
        Ok(by_course)
    }
}
