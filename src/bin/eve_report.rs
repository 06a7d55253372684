//! Reads an alert log (file path or http(s) URL) once and prints the three views as JSON.
//!
//! Usage: `eve_report [PATH_OR_URL]` (defaults to the configured source).

use network_alert_dashboard::api::DashboardResponse;
use network_alert_dashboard::ingest::{self, providers, types::LogSource};
use network_alert_dashboard::{DashboardConfig, SourceConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut cfg = DashboardConfig::load_default()?;
    if let Some(arg) = std::env::args().nth(1) {
        cfg.source = if arg.starts_with("http://") || arg.starts_with("https://") {
            SourceConfig::Http {
                url: arg,
                timeout_secs: providers::http::DEFAULT_TIMEOUT_SECS,
            }
        } else {
            SourceConfig::File { path: arg.into() }
        };
    }

    let source: Arc<dyn LogSource> = providers::from_config(&cfg.source)?;
    let report = ingest::run_once(source.as_ref(), cfg.pipeline_options()).await?;
    let out = DashboardResponse::from_report(report, cfg.max_reported_failures);

    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
