//! High-level client that wraps the pure validator, the lock coordinator
//! and pluggable storage. The HTTP server delegates to this.

use crate::config::SchedulingConfig;
use crate::coordinator::{LockCoordinator, now_ms};
use crate::error::{Result, ScheduleError};
use crate::infrastructure::{LeaseStore, ScheduleStore};
use crate::infrastructure_in_memory::{InMemoryLeaseStore, InMemoryScheduleStore};
use crate::normalize::normalize_slot;
use crate::types::*;
use crate::validator::{EnrollmentRequest, EnrollmentSnapshot, ScheduleValidator};

/// The main entry point. Each call is independent; concurrency safety comes
/// from the shared lease store and the record store's transactions.
pub struct SchedulingClient<S, L> {
    store: S,
    coordinator: LockCoordinator<L>,
    config: SchedulingConfig,
}

impl SchedulingClient<InMemoryScheduleStore, InMemoryLeaseStore> {
    /// Create a client over empty in-memory stores.
    pub fn in_memory(config: SchedulingConfig) -> Self {
        Self::new(InMemoryScheduleStore::new(), InMemoryLeaseStore::new(), config)
    }
}

#[cfg(feature = "sqlite")]
impl
    SchedulingClient<
        crate::infrastructure_sqlite::SqliteScheduleStore,
        crate::infrastructure_sqlite::SqliteLeaseStore,
    >
{
    /// Create a client whose records and leases live in one SQLite file.
    /// Every process opening the same file shares the leases.
    pub fn with_sqlite(path: &str, config: SchedulingConfig) -> Result<Self> {
        let open_failed =
            |e: rusqlite::Error| ScheduleError::Storage(format!("Failed to open SQLite database at '{}': {}", path, e));
        let store = crate::infrastructure_sqlite::SqliteScheduleStore::open(path).map_err(open_failed)?;
        let leases = crate::infrastructure_sqlite::SqliteLeaseStore::open(path).map_err(open_failed)?;
        Ok(Self::new(store, leases, config))
    }
}

impl<S: ScheduleStore, L: LeaseStore> SchedulingClient<S, L> {
    pub fn new(store: S, leases: L, config: SchedulingConfig) -> Self {
        Self {
            store,
            coordinator: LockCoordinator::new(leases, config.lease.clone()),
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn coordinator(&self) -> &LockCoordinator<L> {
        &self.coordinator
    }

    pub fn config(&self) -> &SchedulingConfig {
        &self.config
    }

    // ─── Registry ───────────────────────────────────────────────────────────

    pub async fn register_student(&self, student: Student) -> Result<Student> {
        if student.name.trim().is_empty() {
            return Err(ScheduleError::invalid("student name is required"));
        }
        let saved = self.store.register_student(student).await?;
        tracing::info!(student_id = saved.id, college_id = saved.college_id, "Student registered");
        Ok(saved)
    }

    pub async fn register_course(&self, course: Course) -> Result<Course> {
        if course.code.trim().is_empty() {
            return Err(ScheduleError::invalid("course code is required"));
        }
        let saved = self.store.register_course(course).await?;
        tracing::info!(course_id = saved.id, college_id = saved.college_id, "Course registered");
        Ok(saved)
    }

    // ─── Timetable ──────────────────────────────────────────────────────────

    /// Add a new weekly slot to a course.
    pub async fn add_slot(
        &self,
        course_id: CourseId,
        day_of_week: &str,
        start_time: &str,
        end_time: &str,
    ) -> Result<WeeklySlot> {
        self.add_or_update_slot(course_id, day_of_week, start_time, end_time, None)
            .await
    }

    /// Move an existing slot to a new day and time.
    pub async fn update_slot(
        &self,
        slot_id: SlotId,
        day_of_week: &str,
        start_time: &str,
        end_time: &str,
    ) -> Result<WeeklySlot> {
        let slot = self
            .store
            .slot(slot_id)
            .await?
            .ok_or_else(|| ScheduleError::not_found("timetable", slot_id))?;

        self.add_or_update_slot(slot.course_id, day_of_week, start_time, end_time, Some(slot_id))
            .await
    }

    /// Validate a slot against its course's other slots under the course
    /// lease, then persist it. With `exclude_slot_id` the named slot is
    /// updated in place and ignored during the check; otherwise a new slot
    /// is created.
    pub async fn add_or_update_slot(
        &self,
        course_id: CourseId,
        day_of_week: &str,
        start_time: &str,
        end_time: &str,
        exclude_slot_id: Option<SlotId>,
    ) -> Result<WeeklySlot> {
        let spec = normalize_slot(day_of_week, start_time, end_time)?;
        let resource = ResourceRef::course_schedule(course_id);

        self.coordinator
            .with_exclusive_lease(&resource, self.config.lease.ttl(), || {
                self.check_and_save(course_id, spec, exclude_slot_id)
            })
            .await
    }

    /// The critical section: read siblings, check, write. Only called while
    /// the course lease is held.
    async fn check_and_save(
        &self,
        course_id: CourseId,
        spec: SlotSpec,
        exclude_slot_id: Option<SlotId>,
    ) -> Result<WeeklySlot> {
        let siblings = self.store.slots_by_course(course_id).await?;

        // The lease covers this course only; a slot of another course is out of reach
        if let Some(id) = exclude_slot_id {
            if !siblings.iter().any(|s| s.id == id) {
                return Err(ScheduleError::not_found("timetable", id));
            }
        }

        let delay = self.config.critical_section_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Err(e) = ScheduleValidator::check_slot(&spec, &siblings, exclude_slot_id) {
            tracing::info!(course_id, day = %spec.day_of_week, error = %e, "Timetable slot rejected");
            return Err(e);
        }

        let saved = match exclude_slot_id {
            Some(id) => {
                self.store
                    .update_slot(WeeklySlot {
                        id,
                        course_id,
                        day_of_week: spec.day_of_week,
                        start_time: spec.start_time,
                        end_time: spec.end_time,
                    })
                    .await?
            }
            None => self.store.create_slot(NewSlot { course_id, spec }).await?,
        };

        tracing::info!(
            course_id,
            slot_id = saved.id,
            day = %saved.day_of_week,
            start = %saved.start_time,
            end = %saved.end_time,
            "Timetable slot saved"
        );
        Ok(saved)
    }

    /// Delete a slot. Removal cannot create a clash, so no lease is taken.
    pub async fn delete_slot(&self, slot_id: SlotId) -> Result<()> {
        if !self.store.delete_slot(slot_id).await? {
            return Err(ScheduleError::not_found("timetable", slot_id));
        }
        tracing::info!(slot_id, "Timetable slot deleted");
        Ok(())
    }

    pub async fn find_slots_by_course(&self, course_id: CourseId) -> Result<Vec<WeeklySlot>> {
        self.store.slots_by_course(course_id).await
    }

    // ─── Enrollment ─────────────────────────────────────────────────────────

    /// Enroll a student in several courses for one semester, all-or-nothing.
    pub async fn enroll_student(
        &self,
        student_id: StudentId,
        course_ids: &[CourseId],
        semester_id: &str,
    ) -> Result<Vec<EnrollmentRecord>> {
        let request = EnrollmentRequest {
            student_id,
            course_ids: course_ids.to_vec(),
            semester_id: semester_id.to_string(),
        };
        ScheduleValidator::require_courses(&request)?;

        if self.config.lock_student_enrollments {
            let resource = ResourceRef::student_schedule(student_id);
            self.coordinator
                .with_exclusive_lease(&resource, self.config.lease.ttl(), || {
                    self.enroll_unlocked(&request)
                })
                .await
        } else {
            self.enroll_unlocked(&request).await
        }
    }

    async fn enroll_unlocked(&self, request: &EnrollmentRequest) -> Result<Vec<EnrollmentRecord>> {
        let student = self
            .store
            .student(request.student_id)
            .await?
            .ok_or_else(|| ScheduleError::not_found("student", request.student_id))?;

        let courses = self.store.courses_by_ids(&request.course_ids).await?;
        let existing_enrollments = self
            .store
            .enrollments_by_student(request.student_id, Some(&request.semester_id))
            .await?;
        let existing_course_ids: Vec<CourseId> =
            existing_enrollments.iter().map(|e| e.course_id).collect();

        let requested_slots = self.store.slots_by_courses(&request.course_ids).await?;
        let existing_slots = self.store.slots_by_courses(&existing_course_ids).await?;

        let snapshot = EnrollmentSnapshot {
            student,
            courses,
            existing_enrollments,
            requested_slots,
            existing_slots,
        };

        if let Err(e) = ScheduleValidator::check_enrollment(&snapshot, request) {
            tracing::info!(
                student_id = request.student_id,
                semester_id = %request.semester_id,
                code = e.code(),
                error = %e,
                "Enrollment rejected"
            );
            return Err(e);
        }

        let enrolled_at = now_ms();
        let batch = request
            .course_ids
            .iter()
            .map(|&course_id| NewEnrollment {
                student_id: request.student_id,
                course_id,
                semester_id: request.semester_id.clone(),
                enrolled_at,
            })
            .collect();

        let committed = self.store.commit_enrollments(batch).await?;
        tracing::info!(
            student_id = request.student_id,
            semester_id = %request.semester_id,
            courses = ?request.course_ids,
            "Enrollment committed"
        );
        Ok(committed)
    }

    pub async fn find_enrollments_by_student(
        &self,
        student_id: StudentId,
        semester_id: Option<&SemesterId>,
    ) -> Result<Vec<EnrollmentRecord>> {
        self.store.enrollments_by_student(student_id, semester_id).await
    }

    // ─── Leases ─────────────────────────────────────────────────────────────

    /// Get all currently live leases.
    pub async fn active_leases(&self) -> Result<Vec<Lease>> {
        self.coordinator.active_leases().await
    }

    /// Evict expired leases. Returns the number of leases evicted.
    pub async fn evict_expired(&self) -> Result<usize> {
        self.coordinator.evict_expired().await
    }
}
