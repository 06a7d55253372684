// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod aggregate;
pub mod api;
pub mod ingest;
pub mod metrics;
pub mod pipeline;
pub mod views;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::ingest::config::{DashboardConfig, SourceConfig};
pub use crate::pipeline::{run, run_with, PipelineOptions, PipelineReport};
pub use crate::views::{CategoryRow, DashboardViews, EndpointRow, TimeBucketRow};

use std::sync::Arc;

/// Build the full Router from a loaded config: log source, pipeline options
/// and the JSON API. `/metrics` is merged by the caller when a recorder exists.
pub fn app(cfg: &DashboardConfig) -> anyhow::Result<axum::Router> {
    let source = ingest::providers::from_config(&cfg.source)?;
    let state = api::AppState {
        source: Arc::clone(&source),
        options: cfg.pipeline_options(),
        max_reported_failures: cfg.max_reported_failures,
        max_body_bytes: cfg.max_body_bytes,
    };
    tracing::info!(source = source.name(), "dashboard app built");
    Ok(api::router(state))
}
