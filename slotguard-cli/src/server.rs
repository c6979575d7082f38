use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use slotguard_core::client::SchedulingClient;
use slotguard_core::config::SchedulingConfig;
use slotguard_core::infrastructure::{LeaseStore, ScheduleStore};
use slotguard_core::types::{Course, EnrollmentRecord, Student, WeeklySlot};

use crate::handlers::*;

pub type AppState<S, L> = Arc<SchedulingClient<S, L>>;

type Reply<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

/// Opens the requested storage backend and serves on it. A backend that
/// cannot be opened is an error; the server never silently drops to memory.
pub async fn run(host: &str, port: u16, storage: &str, config: SchedulingConfig) -> std::io::Result<()> {
    if storage == "memory" {
        tracing::info!("💾 Storage backend: in-memory (records and leases will not persist)");
        return serve(host, port, SchedulingClient::in_memory(config)).await;
    }

    match storage.strip_prefix("sqlite:") {
        Some(path) if !path.is_empty() => serve_sqlite(host, port, path, config).await,
        _ => Err(std::io::Error::other(format!(
            "Unknown storage backend: '{}'. Use 'memory' or 'sqlite:<path>'",
            storage
        ))),
    }
}

#[cfg(feature = "sqlite")]
async fn serve_sqlite(host: &str, port: u16, path: &str, config: SchedulingConfig) -> std::io::Result<()> {
    tracing::info!("💾 Storage backend: SQLite ({})", path);
    let client = SchedulingClient::with_sqlite(path, config).map_err(|e| std::io::Error::other(e.to_string()))?;
    serve(host, port, client).await
}

#[cfg(not(feature = "sqlite"))]
async fn serve_sqlite(_host: &str, _port: u16, path: &str, _config: SchedulingConfig) -> std::io::Result<()> {
    Err(std::io::Error::other(format!(
        "SQLite storage '{}' requested but the `sqlite` feature is not enabled. \
         Rebuild with: cargo build --features sqlite",
        path
    )))
}

async fn serve<S, L>(host: &str, port: u16, client: SchedulingClient<S, L>) -> std::io::Result<()>
where
    S: ScheduleStore + 'static,
    L: LeaseStore + 'static,
{
    let app = router(Arc::new(client));
    let addr = format!("{}:{}", host, port);

    tracing::info!("📅 Slotguard server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await
}

pub fn router<S, L>(state: AppState<S, L>) -> Router
where
    S: ScheduleStore + 'static,
    L: LeaseStore + 'static,
{
    Router::new()
        .route("/health", get(health::<S, L>))
        .route("/students", post(register_student::<S, L>))
        .route("/students/{student_id}/enrollments", get(list_enrollments::<S, L>))
        .route("/courses", post(register_course::<S, L>))
        .route(
            "/courses/{course_id}/timetables",
            post(add_slot::<S, L>).get(list_slots::<S, L>),
        )
        .route("/timetables/{id}", put(update_slot::<S, L>).delete(delete_slot::<S, L>))
        .route("/enrollments", post(enroll::<S, L>))
        .route("/leases", get(list_leases::<S, L>))
        .route("/evict", post(evict_expired::<S, L>))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ─── Handlers ───────────────────────────────────────────────────────────────

async fn health<S: ScheduleStore, L: LeaseStore>(
    State(state): State<AppState<S, L>>,
) -> Reply<HealthResponse> {
    let active_leases = state.active_leases().await?.len();
    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(HealthResponse {
            status: "ok".to_string(),
            active_leases,
            version: env!("CARGO_PKG_VERSION").to_string(),
        })),
    ))
}

async fn register_student<S: ScheduleStore, L: LeaseStore>(
    State(state): State<AppState<S, L>>,
    Json(req): Json<RegisterStudentRequest>,
) -> Reply<Student> {
    req.validate().map_err(ApiError::bad_request)?;
    let student = state.register_student(req.into_student()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(student))))
}

async fn register_course<S: ScheduleStore, L: LeaseStore>(
    State(state): State<AppState<S, L>>,
    Json(req): Json<RegisterCourseRequest>,
) -> Reply<Course> {
    req.validate().map_err(ApiError::bad_request)?;
    let course = state.register_course(req.into_course()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(course))))
}

async fn add_slot<S: ScheduleStore, L: LeaseStore>(
    State(state): State<AppState<S, L>>,
    Path(course_id): Path<u64>,
    Json(req): Json<SlotRequest>,
) -> Reply<WeeklySlot> {
    req.validate().map_err(ApiError::bad_request)?;
    let slot = state
        .add_slot(course_id, &req.day_of_week, &req.start_time, &req.end_time)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(slot))))
}

async fn list_slots<S: ScheduleStore, L: LeaseStore>(
    State(state): State<AppState<S, L>>,
    Path(course_id): Path<u64>,
) -> Reply<Vec<WeeklySlot>> {
    let slots = state.find_slots_by_course(course_id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(slots))))
}

async fn update_slot<S: ScheduleStore, L: LeaseStore>(
    State(state): State<AppState<S, L>>,
    Path(id): Path<u64>,
    Json(req): Json<SlotRequest>,
) -> Reply<WeeklySlot> {
    req.validate().map_err(ApiError::bad_request)?;
    let slot = state
        .update_slot(id, &req.day_of_week, &req.start_time, &req.end_time)
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(slot))))
}

async fn delete_slot<S: ScheduleStore, L: LeaseStore>(
    State(state): State<AppState<S, L>>,
    Path(id): Path<u64>,
) -> Reply<String> {
    state.delete_slot(id).await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(format!("Timetable slot {} deleted", id))),
    ))
}

async fn enroll<S: ScheduleStore, L: LeaseStore>(
    State(state): State<AppState<S, L>>,
    Json(req): Json<EnrollRequest>,
) -> Reply<Vec<EnrollmentRecord>> {
    req.validate().map_err(ApiError::bad_request)?;
    let records = state
        .enroll_student(req.student_id, &req.course_ids, &req.semester_id)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(records))))
}

async fn list_enrollments<S: ScheduleStore, L: LeaseStore>(
    State(state): State<AppState<S, L>>,
    Path(student_id): Path<u64>,
    Query(query): Query<EnrollmentQuery>,
) -> Reply<Vec<EnrollmentRecord>> {
    let records = state
        .find_enrollments_by_student(student_id, query.semester_id.as_ref())
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(records))))
}

async fn list_leases<S: ScheduleStore, L: LeaseStore>(
    State(state): State<AppState<S, L>>,
) -> Reply<Vec<ActiveLeaseInfo>> {
    let leases = state
        .active_leases()
        .await?
        .iter()
        .map(ActiveLeaseInfo::from)
        .collect();
    Ok((StatusCode::OK, Json(ApiResponse::ok(leases))))
}

async fn evict_expired<S: ScheduleStore, L: LeaseStore>(
    State(state): State<AppState<S, L>>,
) -> Reply<EvictResponse> {
    let evicted = state.evict_expired().await?;
    tracing::info!(evicted = evicted, "Expired leases evicted");
    Ok((StatusCode::OK, Json(ApiResponse::ok(EvictResponse { evicted }))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_backend_refuses_to_start() {
        for storage in ["redis", "sqlite:", "Memory"] {
            let err = run("127.0.0.1", 0, storage, SchedulingConfig::default())
                .await
                .unwrap_err();
            assert!(err.to_string().contains("Unknown storage backend"), "{}", err);
        }
    }

    #[tokio::test]
    async fn unopenable_sqlite_refuses_to_start() {
        let dir = std::env::temp_dir().join("slotguard-missing-dir").join("nested");
        let storage = format!("sqlite:{}", dir.join("records.db").display());
        assert!(run("127.0.0.1", 0, &storage, SchedulingConfig::default())
            .await
            .is_err());
    }
}
