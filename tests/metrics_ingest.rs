// tests/metrics_ingest.rs
#![cfg(feature = "strict-metrics")]
use network_alert_dashboard::ingest::providers::fixture::FixtureLogSource;
use network_alert_dashboard::metrics::Metrics;
use network_alert_dashboard::{ingest, PipelineOptions};

#[tokio::test]
async fn metrics_exposed_after_ingest() {
    // Installs the process-wide recorder; keep this the only test in the binary.
    let m = Metrics::init().expect("recorder");

    let src = FixtureLogSource::new("{\"alert\":{\"category\":\"A\"}}\nbad\n");
    let _ = ingest::run_once(&src, PipelineOptions::default()).await;

    // Scrape metrics text and check series presence by substring
    let out = m.handle.render();
    for needle in [
        "ingest_lines_total",
        "ingest_records_total",
        "ingest_parse_failures_total",
        "pipeline_runs_total",
        "pipeline_duration_ms",
    ] {
        assert!(out.contains(needle), "metrics exposition missing '{needle}'\n{out}");
    }
}
