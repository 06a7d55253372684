use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::ingest::{
    self,
    types::{IngestError, LogSource},
};
use crate::pipeline::{self, PipelineOptions, PipelineReport};
use crate::views::DashboardViews;

/// Upload cap for `POST /api/analyze` when none is configured.
pub const DEFAULT_MAX_BODY_BYTES: usize = 256 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn LogSource>,
    pub options: PipelineOptions,
    pub max_reported_failures: usize,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(source: Arc<dyn LogSource>) -> Self {
        Self {
            source,
            options: PipelineOptions::default(),
            max_reported_failures: 50,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_body_bytes);
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/dashboard", get(dashboard))
        .route("/api/analyze", post(analyze).layer(body_limit))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct FailureOut {
    pub line_no: usize,
    /// Hashed id of the rejected line; the raw text is never echoed.
    pub id: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct StatsOut {
    pub lines: usize,
    pub records: usize,
    pub parse_failures: usize,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    #[serde(flatten)]
    pub views: DashboardViews,
    pub stats: StatsOut,
    pub failures: Vec<FailureOut>,
    pub source_error: Option<String>,
}

impl DashboardResponse {
    pub fn from_report(report: PipelineReport, max_failures: usize) -> Self {
        let failures = report
            .failures
            .iter()
            .take(max_failures)
            .map(|f| FailureOut {
                line_no: f.line_no,
                id: f.fingerprint(),
                error: f.source.to_string(),
            })
            .collect();

        Self {
            views: report.views,
            stats: StatsOut {
                lines: report.lines,
                records: report.records,
                parse_failures: report.failures.len(),
            },
            failures,
            source_error: None,
        }
    }

    /// Retrieval failed: empty charts plus the reason.
    pub fn source_failed(err: &anyhow::Error) -> Self {
        Self {
            views: DashboardViews::default(),
            stats: StatsOut {
                lines: 0,
                records: 0,
                parse_failures: 0,
            },
            failures: Vec::new(),
            source_error: Some(format!("{err:#}")),
        }
    }
}

/// Retrieval failures still render an (empty) dashboard; a dead aggregation
/// task is a server error.
pub(crate) fn ingest_error_response(err: IngestError) -> Response {
    match err {
        IngestError::Source(e) => Json(DashboardResponse::source_failed(&e)).into_response(),
        IngestError::Pipeline(e) => {
            tracing::error!(target: "pipeline", error = ?e, "aggregation task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "aggregation failed").into_response()
        }
    }
}

async fn dashboard(State(state): State<AppState>) -> Response {
    match ingest::run_once(state.source.as_ref(), state.options).await {
        Ok(report) => Json(DashboardResponse::from_report(
            report,
            state.max_reported_failures,
        ))
        .into_response(),
        Err(e) => ingest_error_response(e),
    }
}

async fn analyze(State(state): State<AppState>, body: Bytes) -> Response {
    let options = state.options;
    match tokio::task::spawn_blocking(move || pipeline::run_with(&body, &options)).await {
        Ok(report) => Json(DashboardResponse::from_report(
            report,
            state.max_reported_failures,
        ))
        .into_response(),
        Err(e) => ingest_error_response(IngestError::Pipeline(e)),
    }
}
