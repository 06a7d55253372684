//! # Pipeline
//! raw bytes → lines → records (+ failures) → three aggregates → three views.
//!
//! Stateless: every call is a complete pass and nothing survives it.

use metrics::{counter, gauge, histogram};
use std::time::Instant;

use crate::aggregate::{aggregate, aggregate_parallel};
use crate::ingest::{self, types::ParseFailure};
use crate::views::{materialize, DashboardViews};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Record count at which the three aggregators run on separate threads.
    pub parallel_threshold: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            parallel_threshold: 4096,
        }
    }
}

/// Result of one pass: the views plus what was dropped on the way.
#[derive(Debug)]
pub struct PipelineReport {
    pub views: DashboardViews,
    pub failures: Vec<ParseFailure>,
    /// Non-blank lines seen.
    pub lines: usize,
    /// Lines that parsed into records.
    pub records: usize,
}

pub fn run(raw: impl AsRef<[u8]>) -> PipelineReport {
    run_with(raw, &PipelineOptions::default())
}

pub fn run_with(raw: impl AsRef<[u8]>, options: &PipelineOptions) -> PipelineReport {
    ingest::ensure_metrics_described();
    let t0 = Instant::now();

    let batch = ingest::parse_payload(raw.as_ref());
    let aggregates = if batch.records.len() >= options.parallel_threshold {
        aggregate_parallel(&batch.records)
    } else {
        aggregate(&batch.records)
    };
    let views = materialize(aggregates);

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("pipeline_duration_ms").record(ms);
    counter!("pipeline_runs_total").increment(1);
    gauge!("pipeline_last_run_ts").set(chrono::Utc::now().timestamp() as f64);

    tracing::info!(
        target: "pipeline",
        lines = batch.lines,
        records = batch.records.len(),
        failures = batch.failures.len(),
        categories = views.categories.len(),
        buckets = views.timeline.len(),
        endpoints = views.endpoints.len(),
        "aggregation pass finished"
    );

    PipelineReport {
        views,
        lines: batch.lines,
        records: batch.records.len(),
        failures: batch.failures,
    }
}
