use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Result, ScheduleError};
use crate::infrastructure::{LeaseStore, ScheduleStore};
use crate::types::{
    Course, CourseId, EnrollmentId, EnrollmentRecord, Lease, LeaseResult, NewEnrollment, NewSlot,
    ResourceRef, SemesterId, SlotId, Student, StudentId, WeeklySlot,
};

/// Lease service held in process memory.
///
/// Clones share the same lease table, so several clients built from clones
/// of one store behave like separate instances talking to one lease server.
#[derive(Clone, Default)]
pub struct InMemoryLeaseStore {
    // Map of resource key -> current lease
    leases: Arc<Mutex<HashMap<String, Lease>>>,
}

impl InMemoryLeaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn leases(&self) -> MutexGuard<'_, HashMap<String, Lease>> {
        self.leases.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LeaseStore for InMemoryLeaseStore {
    async fn try_acquire(
        &self,
        resource: &ResourceRef,
        holder: &str,
        ttl: u64,
        now: u64,
    ) -> Result<LeaseResult> {
        let key = resource.key();
        let mut leases = self.leases();

        if let Some(existing) = leases.get(&key) {
            if !existing.is_expired(now) {
                return Ok(LeaseResult::Failure {
                    existing_lease: Some(existing.clone()),
                    wait_time: Some(existing.remaining_ms(now)),
                });
            }
        }

        let lease = Lease::new(
            nanoid::nanoid!(),
            holder.to_string(),
            resource.clone(),
            ttl,
            now,
        );
        leases.insert(key, lease.clone());

        Ok(LeaseResult::Success { lease })
    }

    async fn release(&self, lease: &Lease) -> Result<bool> {
        let mut leases = self.leases();
        let key = lease.resource.key();
        match leases.get(&key) {
            Some(current) if current.id == lease.id => {
                leases.remove(&key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn active_leases(&self, now: u64) -> Result<Vec<Lease>> {
        Ok(self
            .leases()
            .values()
            .filter(|l| !l.is_expired(now))
            .cloned()
            .collect())
    }

    async fn evict_expired(&self, now: u64) -> Result<usize> {
        let mut leases = self.leases();
        let before = leases.len();
        leases.retain(|_, l| !l.is_expired(now));
        Ok(before - leases.len())
    }
}

#[derive(Default)]
struct Records {
    students: HashMap<StudentId, Student>,
    courses: HashMap<CourseId, Course>,
    slots: BTreeMap<SlotId, WeeklySlot>,
    enrollments: BTreeMap<EnrollmentId, EnrollmentRecord>,
    next_slot_id: SlotId,
    next_enrollment_id: EnrollmentId,
}

/// Record store held in process memory. Clones share the same records.
#[derive(Clone, Default)]
pub struct InMemoryScheduleStore {
    records: Arc<Mutex<Records>>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> MutexGuard<'_, Records> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ScheduleStore for InMemoryScheduleStore {
    async fn slot(&self, id: SlotId) -> Result<Option<WeeklySlot>> {
        Ok(self.records().slots.get(&id).cloned())
    }

    async fn slots_by_course(&self, course_id: CourseId) -> Result<Vec<WeeklySlot>> {
        Ok(self
            .records()
            .slots
            .values()
            .filter(|s| s.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn slots_by_courses(&self, course_ids: &[CourseId]) -> Result<Vec<WeeklySlot>> {
        Ok(self
            .records()
            .slots
            .values()
            .filter(|s| course_ids.contains(&s.course_id))
            .cloned()
            .collect())
    }

    async fn create_slot(&self, slot: NewSlot) -> Result<WeeklySlot> {
        let mut records = self.records();
        if !records.courses.contains_key(&slot.course_id) {
            return Err(ScheduleError::not_found("course", slot.course_id));
        }

        records.next_slot_id += 1;
        let stored = WeeklySlot {
            id: records.next_slot_id,
            course_id: slot.course_id,
            day_of_week: slot.spec.day_of_week,
            start_time: slot.spec.start_time,
            end_time: slot.spec.end_time,
        };
        records.slots.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_slot(&self, slot: WeeklySlot) -> Result<WeeklySlot> {
        let mut records = self.records();
        match records.slots.get_mut(&slot.id) {
            Some(existing) if existing.course_id == slot.course_id => {
                *existing = slot.clone();
                Ok(slot)
            }
            _ => Err(ScheduleError::not_found("timetable", slot.id)),
        }
    }

    async fn delete_slot(&self, id: SlotId) -> Result<bool> {
        Ok(self.records().slots.remove(&id).is_some())
    }

    async fn register_student(&self, student: Student) -> Result<Student> {
        self.records().students.insert(student.id, student.clone());
        Ok(student)
    }

    async fn register_course(&self, course: Course) -> Result<Course> {
        self.records().courses.insert(course.id, course.clone());
        Ok(course)
    }

    async fn student(&self, id: StudentId) -> Result<Option<Student>> {
        Ok(self.records().students.get(&id).cloned())
    }

    async fn courses_by_ids(&self, ids: &[CourseId]) -> Result<Vec<Course>> {
        let records = self.records();
        let mut courses: Vec<Course> = ids
            .iter()
            .filter_map(|id| records.courses.get(id).cloned())
            .collect();
        courses.sort_by_key(|c| c.id);
        courses.dedup_by_key(|c| c.id);
        Ok(courses)
    }

    async fn enrollments_by_student(
        &self,
        student_id: StudentId,
        semester_id: Option<&SemesterId>,
    ) -> Result<Vec<EnrollmentRecord>> {
        Ok(self
            .records()
            .enrollments
            .values()
            .filter(|e| e.student_id == student_id)
            .filter(|e| semester_id.is_none_or(|s| &e.semester_id == s))
            .cloned()
            .collect())
    }

    async fn commit_enrollments(&self, batch: Vec<NewEnrollment>) -> Result<Vec<EnrollmentRecord>> {
        let mut records = self.records();

        // Uniqueness on (student, course, semester), across the store and within the batch
        let mut duplicates = Vec::new();
        for (i, new) in batch.iter().enumerate() {
            let stored = records.enrollments.values().any(|e| {
                e.student_id == new.student_id
                    && e.course_id == new.course_id
                    && e.semester_id == new.semester_id
            });
            let repeated = batch[..i].iter().any(|prev| {
                prev.student_id == new.student_id
                    && prev.course_id == new.course_id
                    && prev.semester_id == new.semester_id
            });
            if stored || repeated {
                duplicates.push(new.course_id);
            }
        }
        if !duplicates.is_empty() {
            return Err(ScheduleError::DuplicateEnrollment {
                course_ids: duplicates,
                semester_id: batch[0].semester_id.clone(),
            });
        }

        let mut committed = Vec::with_capacity(batch.len());
        for new in batch {
            records.next_enrollment_id += 1;
            let record = EnrollmentRecord {
                id: records.next_enrollment_id,
                student_id: new.student_id,
                course_id: new.course_id,
                semester_id: new.semester_id,
                enrolled_at: new.enrolled_at,
            };
            records.enrollments.insert(record.id, record.clone());
            committed.push(record);
        }
        Ok(committed)
    }
}
