//! SQLite-backed lease and record stores.
//! Several processes may open the same database file; lease acquisition is
//! a single conditional upsert, so at most one of them wins a resource.
//!
//! Enable with the `sqlite` feature flag:
//! ```toml
//! slotguard-core = { path = "../slotguard-core", features = ["sqlite"] }
//! ```

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use crate::error::{Result, ScheduleError};
use crate::infrastructure::{LeaseStore, ScheduleStore};
use crate::normalize::{parse_clock_time, parse_day_of_week};
use crate::types::*;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

fn open_connection(path: impl AsRef<Path>) -> std::result::Result<Connection, rusqlite::Error> {
    let conn = Connection::open(path)?;

    // WAL lets readers proceed while another process holds the write lock
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

/// Runs `f` against the shared connection on tokio's blocking pool, so a
/// busy database never stalls the async workers.
async fn with_conn<T, F>(conn: &Arc<Mutex<Connection>>, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
{
    let conn = Arc::clone(conn);
    tokio::task::spawn_blocking(move || {
        let mut guard = conn.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *guard)
    })
    .await
    .map_err(|e| ScheduleError::Storage(format!("blocking task join error: {}", e)))?
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

// ─── Lease Store ────────────────────────────────────────────────────────────

/// A persistent lease store backed by SQLite.
pub struct SqliteLeaseStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLeaseStore {
    /// Open (or create) a lease database at the given path.
    pub fn open(path: impl AsRef<Path>) -> std::result::Result<Self, rusqlite::Error> {
        let conn = open_connection(path)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS leases (
                resource    TEXT PRIMARY KEY,
                id          TEXT NOT NULL,
                holder      TEXT NOT NULL,
                res_kind    TEXT NOT NULL,
                res_id      INTEGER NOT NULL,
                acquired_at INTEGER NOT NULL,
                ttl         INTEGER NOT NULL,
                expires_at  INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_leases_expires ON leases(expires_at);",
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn parse_resource_kind(s: &str) -> ResourceKind {
        match s {
            "StudentSchedule" => ResourceKind::StudentSchedule,
            _ => ResourceKind::CourseSchedule,
        }
    }

    fn row_to_lease(row: &rusqlite::Row) -> rusqlite::Result<Lease> {
        let kind: String = row.get(2)?;
        Ok(Lease {
            id: row.get(0)?,
            holder: row.get(1)?,
            resource: ResourceRef::new(Self::parse_resource_kind(&kind), row.get(3)?),
            acquired_at: row.get(4)?,
            ttl: row.get(5)?,
            expires_at: row.get(6)?,
        })
    }
}

impl LeaseStore for SqliteLeaseStore {
    async fn try_acquire(
        &self,
        resource: &ResourceRef,
        holder: &str,
        ttl: u64,
        now: u64,
    ) -> Result<LeaseResult> {
        let lease = Lease::new(
            nanoid::nanoid!(),
            holder.to_string(),
            resource.clone(),
            ttl,
            now,
        );

        with_conn(&self.conn, move |conn| {
            let key = lease.resource.key();

            // Insert, or take over a row whose lease has already expired
            let changed = conn.execute(
                "INSERT INTO leases (resource, id, holder, res_kind, res_id, acquired_at, ttl, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(resource) DO UPDATE SET
                    id = excluded.id,
                    holder = excluded.holder,
                    acquired_at = excluded.acquired_at,
                    ttl = excluded.ttl,
                    expires_at = excluded.expires_at
                 WHERE leases.expires_at <= excluded.acquired_at",
                params![
                    key,
                    lease.id,
                    lease.holder,
                    format!("{:?}", lease.resource.kind),
                    lease.resource.id,
                    lease.acquired_at,
                    lease.ttl,
                    lease.expires_at,
                ],
            )?;

            if changed > 0 {
                return Ok(LeaseResult::Success { lease });
            }

            let existing = conn
                .query_row(
                    "SELECT id, holder, res_kind, res_id, acquired_at, ttl, expires_at
                     FROM leases WHERE resource = ?1",
                    params![key],
                    Self::row_to_lease,
                )
                .optional()?;

            Ok(LeaseResult::Failure {
                wait_time: existing.as_ref().map(|l| l.remaining_ms(now)),
                existing_lease: existing,
            })
        })
        .await
    }

    async fn release(&self, lease: &Lease) -> Result<bool> {
        let (key, id) = (lease.resource.key(), lease.id.clone());
        with_conn(&self.conn, move |conn| {
            let rows = conn.execute(
                "DELETE FROM leases WHERE resource = ?1 AND id = ?2",
                params![key, id],
            )?;
            Ok(rows > 0)
        })
        .await
    }

    async fn active_leases(&self, now: u64) -> Result<Vec<Lease>> {
        with_conn(&self.conn, move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, holder, res_kind, res_id, acquired_at, ttl, expires_at
                 FROM leases WHERE expires_at > ?1",
            )?;
            let leases = stmt
                .query_map(params![now], Self::row_to_lease)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(leases)
        })
        .await
    }

    async fn evict_expired(&self, now: u64) -> Result<usize> {
        with_conn(&self.conn, move |conn| {
            Ok(conn.execute("DELETE FROM leases WHERE expires_at <= ?1", params![now])?)
        })
        .await
    }
}

// ─── Record Store ───────────────────────────────────────────────────────────

/// A persistent record store backed by SQLite.
pub struct SqliteScheduleStore {
    conn: Arc<Mutex<Connection>>,
}

type RawSlot = (SlotId, CourseId, String, String, String);

impl SqliteScheduleStore {
    /// Open (or create) a record database at the given path.
    pub fn open(path: impl AsRef<Path>) -> std::result::Result<Self, rusqlite::Error> {
        let conn = open_connection(path)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS students (
                id          INTEGER PRIMARY KEY,
                name        TEXT NOT NULL,
                college_id  INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS courses (
                id          INTEGER PRIMARY KEY,
                code        TEXT NOT NULL,
                college_id  INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS course_timetables (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                course_id   INTEGER NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
                day_of_week TEXT NOT NULL,
                start_time  TEXT NOT NULL,
                end_time    TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS enrollments (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id  INTEGER NOT NULL REFERENCES students(id) ON DELETE CASCADE,
                course_id   INTEGER NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
                semester_id TEXT NOT NULL,
                enrolled_at INTEGER NOT NULL,
                UNIQUE (student_id, course_id, semester_id)
            );
            CREATE INDEX IF NOT EXISTS idx_students_college ON students(college_id);
            CREATE INDEX IF NOT EXISTS idx_courses_college ON courses(college_id);
            CREATE INDEX IF NOT EXISTS idx_timetables_course ON course_timetables(course_id);
            CREATE INDEX IF NOT EXISTS idx_enrollments_student ON enrollments(student_id, semester_id);",
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_raw_slot(row: &rusqlite::Row) -> rusqlite::Result<RawSlot> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
    }

    /// Stored day and time columns were written by this store; failing to
    /// parse them means the database was edited by hand.
    fn into_slot((id, course_id, day, start, end): RawSlot) -> Result<WeeklySlot> {
        let corrupt = |e: ScheduleError| {
            ScheduleError::Storage(format!("corrupt timetable row {}: {}", id, e))
        };
        Ok(WeeklySlot {
            id,
            course_id,
            day_of_week: parse_day_of_week(&day).map_err(corrupt)?,
            start_time: parse_clock_time(&start).map_err(corrupt)?,
            end_time: parse_clock_time(&end).map_err(corrupt)?,
        })
    }

    fn row_to_enrollment(row: &rusqlite::Row) -> rusqlite::Result<EnrollmentRecord> {
        Ok(EnrollmentRecord {
            id: row.get(0)?,
            student_id: row.get(1)?,
            course_id: row.get(2)?,
            semester_id: row.get(3)?,
            enrolled_at: row.get(4)?,
        })
    }

    fn is_unique_violation(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    }
}

impl ScheduleStore for SqliteScheduleStore {
    async fn slot(&self, id: SlotId) -> Result<Option<WeeklySlot>> {
        with_conn(&self.conn, move |conn| {
            let raw = conn
                .query_row(
                    "SELECT id, course_id, day_of_week, start_time, end_time
                     FROM course_timetables WHERE id = ?1",
                    params![id],
                    Self::row_to_raw_slot,
                )
                .optional()?;
            raw.map(Self::into_slot).transpose()
        })
        .await
    }

    async fn slots_by_course(&self, course_id: CourseId) -> Result<Vec<WeeklySlot>> {
        self.slots_by_courses(&[course_id]).await
    }

    async fn slots_by_courses(&self, course_ids: &[CourseId]) -> Result<Vec<WeeklySlot>> {
        if course_ids.is_empty() {
            return Ok(Vec::new());
        }

        let course_ids = course_ids.to_vec();
        with_conn(&self.conn, move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT id, course_id, day_of_week, start_time, end_time
                 FROM course_timetables WHERE course_id IN ({}) ORDER BY id",
                placeholders(course_ids.len())
            ))?;
            let raw = stmt
                .query_map(params_from_iter(&course_ids), Self::row_to_raw_slot)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            raw.into_iter().map(Self::into_slot).collect()
        })
        .await
    }

    async fn create_slot(&self, slot: NewSlot) -> Result<WeeklySlot> {
        with_conn(&self.conn, move |conn| {
            let course_exists = conn
                .query_row(
                    "SELECT 1 FROM courses WHERE id = ?1",
                    params![slot.course_id],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if !course_exists {
                return Err(ScheduleError::not_found("course", slot.course_id));
            }

            conn.execute(
                "INSERT INTO course_timetables (course_id, day_of_week, start_time, end_time)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    slot.course_id,
                    slot.spec.day_of_week.name(),
                    slot.spec.start_time.to_string(),
                    slot.spec.end_time.to_string(),
                ],
            )?;

            Ok(WeeklySlot {
                id: conn.last_insert_rowid() as SlotId,
                course_id: slot.course_id,
                day_of_week: slot.spec.day_of_week,
                start_time: slot.spec.start_time,
                end_time: slot.spec.end_time,
            })
        })
        .await
    }

    async fn update_slot(&self, slot: WeeklySlot) -> Result<WeeklySlot> {
        with_conn(&self.conn, move |conn| {
            let rows = conn.execute(
                "UPDATE course_timetables SET day_of_week = ?1, start_time = ?2, end_time = ?3
                 WHERE id = ?4 AND course_id = ?5",
                params![
                    slot.day_of_week.name(),
                    slot.start_time.to_string(),
                    slot.end_time.to_string(),
                    slot.id,
                    slot.course_id,
                ],
            )?;
            if rows == 0 {
                return Err(ScheduleError::not_found("timetable", slot.id));
            }
            Ok(slot)
        })
        .await
    }

    async fn delete_slot(&self, id: SlotId) -> Result<bool> {
        with_conn(&self.conn, move |conn| {
            let rows = conn.execute("DELETE FROM course_timetables WHERE id = ?1", params![id])?;
            Ok(rows > 0)
        })
        .await
    }

    async fn register_student(&self, student: Student) -> Result<Student> {
        with_conn(&self.conn, move |conn| {
            conn.execute(
                "INSERT INTO students (id, name, college_id) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name, college_id = excluded.college_id",
                params![student.id, student.name, student.college_id],
            )?;
            Ok(student)
        })
        .await
    }

    async fn register_course(&self, course: Course) -> Result<Course> {
        with_conn(&self.conn, move |conn| {
            conn.execute(
                "INSERT INTO courses (id, code, college_id) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET code = excluded.code, college_id = excluded.college_id",
                params![course.id, course.code, course.college_id],
            )?;
            Ok(course)
        })
        .await
    }

    async fn student(&self, id: StudentId) -> Result<Option<Student>> {
        with_conn(&self.conn, move |conn| {
            let student = conn
                .query_row(
                    "SELECT id, name, college_id FROM students WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok(Student {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            college_id: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(student)
        })
        .await
    }

    async fn courses_by_ids(&self, ids: &[CourseId]) -> Result<Vec<Course>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = ids.to_vec();
        with_conn(&self.conn, move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT id, code, college_id FROM courses WHERE id IN ({}) ORDER BY id",
                placeholders(ids.len())
            ))?;
            let courses = stmt
                .query_map(params_from_iter(&ids), |row| {
                    Ok(Course {
                        id: row.get(0)?,
                        code: row.get(1)?,
                        college_id: row.get(2)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(courses)
        })
        .await
    }

    async fn enrollments_by_student(
        &self,
        student_id: StudentId,
        semester_id: Option<&SemesterId>,
    ) -> Result<Vec<EnrollmentRecord>> {
        let semester_id = semester_id.cloned();
        with_conn(&self.conn, move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, student_id, course_id, semester_id, enrolled_at FROM enrollments
                 WHERE student_id = ?1 AND (?2 IS NULL OR semester_id = ?2)
                 ORDER BY id",
            )?;
            let enrollments = stmt
                .query_map(params![student_id, semester_id], Self::row_to_enrollment)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(enrollments)
        })
        .await
    }

    async fn commit_enrollments(&self, batch: Vec<NewEnrollment>) -> Result<Vec<EnrollmentRecord>> {
        with_conn(&self.conn, move |conn| {
            let tx = conn.transaction()?;

            let mut committed = Vec::with_capacity(batch.len());
            let mut duplicates = Vec::new();
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO enrollments (student_id, course_id, semester_id, enrolled_at)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                for new in &batch {
                    match stmt.execute(params![
                        new.student_id,
                        new.course_id,
                        new.semester_id,
                        new.enrolled_at
                    ]) {
                        Ok(_) => committed.push(EnrollmentRecord {
                            id: tx.last_insert_rowid() as EnrollmentId,
                            student_id: new.student_id,
                            course_id: new.course_id,
                            semester_id: new.semester_id.clone(),
                            enrolled_at: new.enrolled_at,
                        }),
                        Err(e) if Self::is_unique_violation(&e) => duplicates.push(new.course_id),
                        Err(e) => return Err(e.into()),
                    }
                }
            }

            if !duplicates.is_empty() {
                // Dropping the transaction rolls back the rows that did insert
                return Err(ScheduleError::DuplicateEnrollment {
                    course_ids: duplicates,
                    semester_id: batch[0].semester_id.clone(),
                });
            }

            tx.commit()?;
            Ok(committed)
        })
        .await
    }
}
