//! HTTP query surface.
//!
//! | route | |
//! |---|---|
//! | `GET /health` | liveness |
//! | `POST /api/evaluate` | ingest + classify; optional CSV body (upload) |
//! | `GET /api/load_data` | same, configured data file |
//! | `GET /api/dashboard` | last snapshot as JSON |
//! | `GET /api/download` | processed table as CSV |
//! | `GET /api/map` | last map page |
//! | `GET /api/sample` | sample input table |
//!
//! The session comes from the `x-session-id` header or `?session=`, and
//! defaults to `default`. A header that is present but unreadable is a 400,
//! not a fallback to the query. Evaluation is blocking and runs on tokio's
//! blocking pool.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::logging::{self, Component};
use crate::pipeline::{Dashboard, PipelineError, PlantSource};
use crate::reference_plants;
use crate::render::table;
use crate::store::{valid_session_id, DashboardSnapshot, DEFAULT_SESSION};

pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<Dashboard>,
}

impl AppState {
    pub fn new(dashboard: Dashboard) -> Self {
        Self { dashboard: Arc::new(dashboard) }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/evaluate", post(evaluate))
        .route("/api/load_data", get(load_data))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/download", get(download_processed))
        .route("/api/map", get(get_map))
        .route("/api/sample", get(download_sample))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    pub session: Option<String>,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

fn session_id(headers: &HeaderMap, query: &SessionQuery) -> Result<String, ApiError> {
    let invalid = || api_error(StatusCode::BAD_REQUEST, "invalid session id");

    let session = match headers.get(SESSION_HEADER) {
        Some(value) => value.to_str().map_err(|_| invalid())?.to_string(),
        None => query.session.clone().unwrap_or_else(|| DEFAULT_SESSION.to_string()),
    };

    if valid_session_id(&session) {
        Ok(session)
    } else {
        Err(invalid())
    }
}

fn current_snapshot(state: &AppState, session: &str) -> Result<Arc<DashboardSnapshot>, ApiError> {
    state
        .dashboard
        .store()
        .get(session)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "No data available"))
}

fn attachment(content_type: &'static str, file_name: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file_name)),
        ],
        body,
    )
        .into_response()
}

fn summary_json(snapshot: &DashboardSnapshot) -> serde_json::Value {
    json!({
        "success": true,
        "session": snapshot.session,
        "total_plants": snapshot.counts.total,
        "safe_count": snapshot.counts.safe,
        "moderate_count": snapshot.counts.moderate,
        "dangerous_count": snapshot.counts.dangerous,
        "unknown_count": snapshot.counts.unknown,
        "safe_zones": snapshot.zones.safe,
        "moderate_zones": snapshot.zones.moderate,
        "dangerous_zones": snapshot.zones.dangerous,
        "on_site_plants": snapshot.on_site_plants,
        "map_filename": snapshot.map_filename,
        "user_location": snapshot.user_location,
        "notification": snapshot.notification,
    })
}

async fn run_evaluation(state: AppState, session: String, source: PlantSource) -> Result<Json<serde_json::Value>, ApiError> {
    let uploaded = matches!(source, PlantSource::Upload(_));
    let dashboard = Arc::clone(&state.dashboard);
    let task_session = session.clone();

    let result = tokio::task::spawn_blocking(move || dashboard.evaluate(&task_session, source))
        .await
        .map_err(|e| {
            logging::error(Component::Http, Some(&session), &format!("evaluation task failed: {}", e));
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Error processing data: evaluation task failed")
        })?;

    match result {
        Ok(snapshot) => Ok(Json(summary_json(&snapshot))),
        Err(e) => {
            let status = match (&e, uploaded) {
                (PipelineError::Ingest(_), true) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Err(api_error(status, format!("Error processing data: {}", e)))
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn evaluate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let session = session_id(&headers, &query)?;
    let source = if body.iter().all(u8::is_ascii_whitespace) {
        PlantSource::ConfiguredFile
    } else {
        PlantSource::Upload(body.to_vec())
    };
    run_evaluation(state, session, source).await
}

async fn load_data(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let session = session_id(&headers, &query)?;
    run_evaluation(state, session, PlantSource::ConfiguredFile).await
}

async fn get_dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
) -> Result<Json<DashboardSnapshot>, ApiError> {
    let session = session_id(&headers, &query)?;
    let snapshot = current_snapshot(&state, &session)?;
    Ok(Json(snapshot.as_ref().clone()))
}

async fn download_processed(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
) -> Result<Response, ApiError> {
    let session = session_id(&headers, &query)?;
    let snapshot = current_snapshot(&state, &session)?;
    let csv = table::processed_csv_string(&snapshot.plants)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(attachment("text/csv", table::PROCESSED_FILE_NAME, csv))
}

async fn get_map(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
) -> Result<Html<String>, ApiError> {
    let session = session_id(&headers, &query)?;
    let snapshot = current_snapshot(&state, &session)?;
    let file_name = snapshot
        .map_filename
        .as_deref()
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "No map available"))?;
    let path = std::path::Path::new(&state.dashboard.config().map.output_dir).join(file_name);

    tokio::fs::read_to_string(&path).await.map(Html).map_err(|e| {
        logging::warn(Component::Http, Some(&session), &format!("map {} unreadable: {}", path.display(), e));
        api_error(StatusCode::NOT_FOUND, "No map available")
    })
}

async fn download_sample() -> Result<Response, ApiError> {
    let csv = reference_plants::sample_csv()
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(attachment("text/csv", reference_plants::SAMPLE_FILE_NAME, csv))
}
