use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use slotguard_core::conflict::ConflictEngine;
use slotguard_core::normalize::normalize_slot;
use slotguard_core::types::{Course, Lease, SlotSpec, Student};
use slotguard_core::ScheduleError;

// ─── Validation Helpers ─────────────────────────────────────────────────────

fn require(value: &str, field: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} is required", field))
    } else {
        Ok(())
    }
}

// ─── Request Types ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RegisterStudentRequest {
    pub id: u64,
    pub name: String,
    pub college_id: u64,
}

impl RegisterStudentRequest {
    pub fn validate(&self) -> Result<(), String> {
        require(&self.name, "name")
    }

    pub fn into_student(self) -> Student {
        Student {
            id: self.id,
            name: self.name,
            college_id: self.college_id,
        }
    }
}

#[derive(Deserialize)]
pub struct RegisterCourseRequest {
    pub id: u64,
    pub code: String,
    pub college_id: u64,
}

impl RegisterCourseRequest {
    pub fn validate(&self) -> Result<(), String> {
        require(&self.code, "code")
    }

    pub fn into_course(self) -> Course {
        Course {
            id: self.id,
            code: self.code,
            college_id: self.college_id,
        }
    }
}

/// Raw day and times as the caller typed them; the core normalizes them.
#[derive(Deserialize)]
pub struct SlotRequest {
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
}

impl SlotRequest {
    pub fn validate(&self) -> Result<(), String> {
        require(&self.day_of_week, "day_of_week")?;
        require(&self.start_time, "start_time")?;
        require(&self.end_time, "end_time")
    }
}

#[derive(Deserialize)]
pub struct EnrollRequest {
    pub student_id: u64,
    pub course_ids: Vec<u64>,
    pub semester_id: String,
}

impl EnrollRequest {
    pub fn validate(&self) -> Result<(), String> {
        require(&self.semester_id, "semester_id")?;
        if self.course_ids.is_empty() {
            return Err("course_ids must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Deserialize)]
pub struct EnrollmentQuery {
    pub semester_id: Option<String>,
}

// ─── Response Types ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn err(msg: impl Into<String>, code: &'static str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
            code: Some(code),
        }
    }
}

/// Wraps a core error so handlers can return it with `?`.
pub struct ApiError(pub ScheduleError);

impl From<ScheduleError> for ApiError {
    fn from(e: ScheduleError) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    /// A request body that failed shape validation before reaching the core.
    pub fn bad_request(msg: String) -> Self {
        ApiError(ScheduleError::InvalidInput(msg))
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ScheduleError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ScheduleError::NotFound { .. } => StatusCode::NOT_FOUND,
            ScheduleError::ScheduleConflict { .. } => StatusCode::CONFLICT,
            ScheduleError::DuplicateEnrollment { .. } => StatusCode::CONFLICT,
            ScheduleError::LockUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ScheduleError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }
        let body = ApiResponse::<()>::err(self.0.to_string(), self.0.code());
        (status, Json(body)).into_response()
    }
}

#[derive(Serialize)]
pub struct ActiveLeaseInfo {
    pub id: String,
    pub holder: String,
    pub resource: String,
    pub expires_at: u64,
}

impl From<&Lease> for ActiveLeaseInfo {
    fn from(l: &Lease) -> Self {
        Self {
            id: l.id.clone(),
            holder: l.holder.clone(),
            resource: l.resource.key(),
            expires_at: l.expires_at,
        }
    }
}

#[derive(Serialize)]
pub struct EvictResponse {
    pub evicted: usize,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub active_leases: usize,
    pub version: String,
}

#[derive(Serialize)]
pub struct ClashReport {
    pub slots: Vec<SlotSpec>,
    /// Index pairs into `slots`
    pub clashes: Vec<(usize, usize)>,
}

/// Normalizes a batch of raw slots and reports every overlapping pair.
pub fn clash_report(slots: &[SlotRequest]) -> Result<ClashReport, ScheduleError> {
    let specs = slots
        .iter()
        .enumerate()
        .map(|(i, s)| {
            normalize_slot(&s.day_of_week, &s.start_time, &s.end_time)
                .map_err(|e| match e {
                    ScheduleError::InvalidInput(msg) => {
                        ScheduleError::InvalidInput(format!("slots[{}]: {}", i, msg))
                    }
                    other => other,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let clashes = ConflictEngine::find_clashes(&specs)?;
    Ok(ClashReport {
        slots: specs,
        clashes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotguard_core::error::ConflictContext;
    use slotguard_core::types::ConflictTarget;

    fn slot(day: &str, start: &str, end: &str) -> SlotRequest {
        SlotRequest {
            day_of_week: day.to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
        }
    }

    #[test]
    fn blank_fields_fail_validation() {
        assert!(slot("", "10:00", "11:00").validate().is_err());
        assert!(slot("Monday", " ", "11:00").validate().is_err());
        assert!(slot("Monday", "10:00", "11:00").validate().is_ok());

        let enroll = EnrollRequest {
            student_id: 1,
            course_ids: vec![],
            semester_id: "Fall-2024".to_string(),
        };
        assert!(enroll.validate().is_err());
    }

    #[test]
    fn errors_map_to_statuses() {
        let cases = [
            (ScheduleError::invalid("bad"), StatusCode::BAD_REQUEST),
            (ScheduleError::not_found("student", 1), StatusCode::NOT_FOUND),
            (
                ScheduleError::ScheduleConflict {
                    context: ConflictContext::CourseTimetable,
                    conflicting_with: ConflictTarget::Slot(1),
                },
                StatusCode::CONFLICT,
            ),
            (
                ScheduleError::DuplicateEnrollment {
                    course_ids: vec![1],
                    semester_id: "Fall-2024".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (
                ScheduleError::LockUnavailable {
                    resource: "course-schedule:1".to_string(),
                    attempts: 11,
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (ScheduleError::Storage("disk".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }

    #[test]
    fn error_body_carries_code() {
        let body = ApiResponse::<()>::err("lease busy", "LOCK_UNAVAILABLE");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "error": "lease busy", "code": "LOCK_UNAVAILABLE"})
        );
    }

    #[test]
    fn clash_report_lists_overlapping_pairs() {
        let report = clash_report(&[
            slot("Monday", "22:00", "02:00"),
            slot("Tuesday", "01:00", "03:00"),
            slot("Tuesday", "03:00", "04:00"),
        ])
        .unwrap();
        assert_eq!(report.clashes, vec![(0, 1)]);
        assert_eq!(report.slots.len(), 3);
    }

    #[test]
    fn clash_report_names_the_bad_slot() {
        let err = clash_report(&[slot("Monday", "10:00", "11:00"), slot("Mon", "10:00", "11:00")])
            .err()
            .unwrap();
        assert!(err.to_string().contains("slots[1]"));
    }
}
