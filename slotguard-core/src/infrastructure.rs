use std::future::Future;

use crate::error::Result;
use crate::types::{
    Course, CourseId, EnrollmentRecord, Lease, LeaseResult, NewEnrollment, NewSlot, ResourceRef,
    SemesterId, SlotId, Student, StudentId, WeeklySlot,
};

// Every call may block on I/O, so the contracts are async. Implementations
// take `&self` because one store is shared by every concurrent request.

/// Defines the contract for lease storage backends.
pub trait LeaseStore: Send + Sync {
    /// Attempt to acquire an exclusive lease on a resource. Succeeds when no
    /// live lease exists for it; an expired lease is taken over.
    fn try_acquire(
        &self,
        resource: &ResourceRef,
        holder: &str,
        ttl: u64,
        now: u64,
    ) -> impl Future<Output = Result<LeaseResult>> + Send;

    /// Release a lease. Returns false if the token no longer owns the resource.
    fn release(&self, lease: &Lease) -> impl Future<Output = Result<bool>> + Send;

    /// Get all live leases
    fn active_leases(&self, now: u64) -> impl Future<Output = Result<Vec<Lease>>> + Send;

    /// Drop expired leases based on the current time
    fn evict_expired(&self, now: u64) -> impl Future<Output = Result<usize>> + Send;
}

/// Defines the contract for the durable record store the scheduler reads
/// and writes.
pub trait ScheduleStore: Send + Sync {
    fn slot(&self, id: SlotId) -> impl Future<Output = Result<Option<WeeklySlot>>> + Send;

    fn slots_by_course(
        &self,
        course_id: CourseId,
    ) -> impl Future<Output = Result<Vec<WeeklySlot>>> + Send;

    fn slots_by_courses(
        &self,
        course_ids: &[CourseId],
    ) -> impl Future<Output = Result<Vec<WeeklySlot>>> + Send;

    fn create_slot(&self, slot: NewSlot) -> impl Future<Output = Result<WeeklySlot>> + Send;

    /// Overwrites an existing slot of the same course; `NotFound` if it was
    /// deleted meanwhile or belongs to another course.
    fn update_slot(&self, slot: WeeklySlot) -> impl Future<Output = Result<WeeklySlot>> + Send;

    /// Returns false if no slot had that id.
    fn delete_slot(&self, id: SlotId) -> impl Future<Output = Result<bool>> + Send;

    /// Insert or replace a student.
    fn register_student(&self, student: Student) -> impl Future<Output = Result<Student>> + Send;

    /// Insert or replace a course.
    fn register_course(&self, course: Course) -> impl Future<Output = Result<Course>> + Send;

    fn student(&self, id: StudentId) -> impl Future<Output = Result<Option<Student>>> + Send;

    /// Courses for the given ids; unknown ids are simply absent.
    fn courses_by_ids(
        &self,
        ids: &[CourseId],
    ) -> impl Future<Output = Result<Vec<Course>>> + Send;

    /// A student's enrollments, optionally restricted to one semester.
    fn enrollments_by_student(
        &self,
        student_id: StudentId,
        semester_id: Option<&SemesterId>,
    ) -> impl Future<Output = Result<Vec<EnrollmentRecord>>> + Send;

    /// Persists a batch of enrollments all-or-nothing. A uniqueness
    /// violation fails the whole batch with `DuplicateEnrollment`.
    fn commit_enrollments(
        &self,
        batch: Vec<NewEnrollment>,
    ) -> impl Future<Output = Result<Vec<EnrollmentRecord>>> + Send;
}
