// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod types;

use crate::ingest::types::{
    AlertRecord, IngestError, LogSource, ParseFailure, ParsedBatch, RawLine, RecordError,
};
use crate::pipeline::{self, PipelineOptions, PipelineReport};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use serde_json::Value;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_lines_total", "Non-blank lines seen by the parser.");
        describe_counter!("ingest_records_total", "Lines parsed into alert records.");
        describe_counter!(
            "ingest_parse_failures_total",
            "Lines rejected as malformed JSON records."
        );
        describe_counter!(
            "ingest_source_errors_total",
            "Log source fetch errors."
        );
        describe_counter!("pipeline_runs_total", "Completed aggregation passes.");
        describe_histogram!("pipeline_duration_ms", "Aggregation pass time in milliseconds.");
        describe_gauge!(
            "pipeline_last_run_ts",
            "Unix ts when the pipeline last ran."
        );
    });
}

/// Split a raw payload into non-blank lines. Handles `\n` and `\r\n`; a
/// trailing newline or an empty payload simply yields fewer lines. Lines are
/// not decoded here, so invalid UTF-8 only affects the line that carries it.
pub fn split_lines(raw: &[u8]) -> Vec<RawLine<'_>> {
    raw.split(|b| *b == b'\n')
        .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
        .enumerate()
        .filter(|(_, l)| !is_blank(l))
        .map(|(i, bytes)| RawLine { number: i + 1, bytes })
        .collect()
}

fn is_blank(line: &[u8]) -> bool {
    std::str::from_utf8(line).is_ok_and(|s| s.trim().is_empty())
}

/// Parse one line into an [`AlertRecord`]. Missing or oddly typed fields are
/// not errors; only text that is not a JSON object is.
pub fn parse_line(line: &str) -> Result<AlertRecord, RecordError> {
    let value: Value = serde_json::from_str(line)?;
    if !value.is_object() {
        return Err(RecordError::NotAnObject {
            found: json_kind(&value),
        });
    }
    Ok(serde_json::from_value(value)?)
}

/// Parse every line, collecting failures instead of stopping at the first one.
pub fn parse_lines(lines: &[RawLine<'_>]) -> ParsedBatch {
    let mut batch = ParsedBatch {
        lines: lines.len(),
        records: Vec::with_capacity(lines.len()),
        failures: Vec::new(),
    };

    for l in lines {
        let parsed = l
            .text()
            .map_err(RecordError::from)
            .and_then(parse_line);
        match parsed {
            Ok(rec) => batch.records.push(rec),
            Err(source) => {
                let failure = ParseFailure {
                    line_no: l.number,
                    line: String::from_utf8_lossy(l.bytes).into_owned(),
                    source,
                };
                // Never log raw text. Only line number + hashed id.
                tracing::warn!(
                    target: "ingest",
                    line_no = failure.line_no,
                    id = %failure.fingerprint(),
                    error = %failure.source,
                    "skipping malformed line"
                );
                batch.failures.push(failure);
            }
        }
    }

    counter!("ingest_lines_total").increment(batch.lines as u64);
    counter!("ingest_records_total").increment(batch.records.len() as u64);
    counter!("ingest_parse_failures_total").increment(batch.failures.len() as u64);

    batch
}

/// Splitter + parser in one call.
pub fn parse_payload(raw: &[u8]) -> ParsedBatch {
    parse_lines(&split_lines(raw))
}

/// First 6 bytes of SHA-256, hex encoded.
pub(crate) fn fingerprint(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Fetch the payload from `source` and run one aggregation pass over it.
/// A fetch error is logged and returned as [`IngestError::Source`]; a panic in
/// the aggregation task comes back as [`IngestError::Pipeline`].
pub async fn run_once(
    source: &dyn LogSource,
    options: PipelineOptions,
) -> Result<PipelineReport, IngestError> {
    ensure_metrics_described();

    let raw = match source.fetch().await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(target: "ingest", error = ?e, source = source.name(), "log source error");
            counter!("ingest_source_errors_total").increment(1);
            return Err(IngestError::Source(e));
        }
    };

    let report = tokio::task::spawn_blocking(move || pipeline::run_with(&raw, &options)).await?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::providers::fixture::FixtureLogSource;
    use crate::ingest::types::PortValue;

    #[test]
    fn split_handles_crlf_trailing_newline_and_blanks() {
        let raw = b"{\"a\":1}\r\n\r\n   \n{\"b\":2}\n";
        let lines = split_lines(raw);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].bytes, b"{\"a\":1}");
        assert_eq!(lines[0].number, 1);
        assert_eq!(lines[1].text().unwrap(), "{\"b\":2}");
        assert_eq!(lines[1].number, 4);
    }

    #[test]
    fn split_empty_and_whitespace_only() {
        assert!(split_lines(b"").is_empty());
        assert!(split_lines(b"\n\n \t\r\n").is_empty());
    }

    #[test]
    fn invalid_utf8_line_fails_alone() {
        let raw = b"{\"alert\":{\"category\":\"A\"}}\n{\"alert\":{\"category\":\"\xff\"}}\n{\"alert\":{\"category\":\"A\"}}\n";
        let batch = parse_payload(raw);
        assert_eq!(batch.lines, 3);
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].line_no, 2);
        assert!(matches!(batch.failures[0].source, RecordError::InvalidUtf8(_)));
    }

    #[tokio::test]
    async fn run_once_keeps_source_and_pipeline_errors_apart() {
        struct Down;

        #[async_trait::async_trait]
        impl LogSource for Down {
            async fn fetch(&self) -> anyhow::Result<Vec<u8>> {
                anyhow::bail!("connection refused")
            }
            fn name(&self) -> &'static str {
                "down"
            }
        }

        let err = run_once(&Down, PipelineOptions::default()).await.unwrap_err();
        assert!(matches!(err, IngestError::Source(_)));
        assert_eq!(err.to_string(), "connection refused");

        let ok = FixtureLogSource::new("{\"alert\":{\"category\":\"A\"}}\n");
        let report = run_once(&ok, PipelineOptions::default()).await.unwrap();
        assert_eq!(report.records, 1);
    }

    #[test]
    fn parse_line_reads_nested_category_and_fields() {
        let rec = parse_line(
            r#"{"timestamp":"2024-01-01T00:00:30Z","alert":{"category":"Misc","severity":2},"src_ip":"10.0.0.1","dest_port":443,"event_type":"alert"}"#,
        )
        .unwrap();
        assert_eq!(rec.category(), Some("Misc"));
        assert_eq!(rec.timestamp.as_deref(), Some("2024-01-01T00:00:30Z"));
        assert_eq!(rec.src_ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(rec.dest_port, Some(PortValue::Number(443)));
    }

    #[test]
    fn missing_and_mistyped_fields_are_not_errors() {
        let rec = parse_line(r#"{"alert":"oops","src_ip":5,"dest_port":null,"timestamp":""}"#)
            .unwrap();
        assert_eq!(rec, AlertRecord::default());
        assert_eq!(parse_line("{}").unwrap(), AlertRecord::default());
    }

    #[test]
    fn non_object_json_is_rejected() {
        assert!(matches!(
            parse_line("[1,2]"),
            Err(RecordError::NotAnObject { found: "array" })
        ));
        assert!(matches!(
            parse_line("42"),
            Err(RecordError::NotAnObject { found: "number" })
        ));
        assert!(matches!(parse_line("NOT JSON"), Err(RecordError::Json(_))));
    }

    #[test]
    fn parse_lines_collects_failures_and_continues() {
        let raw = "{\"alert\":{\"category\":\"A\"}}\nNOT JSON\n{\"alert\":{\"category\":\"A\"}}";
        let batch = parse_payload(raw.as_bytes());
        assert_eq!(batch.lines, 3);
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].line_no, 2);
        assert_eq!(batch.failures[0].line, "NOT JSON");
    }

    #[test]
    fn fingerprint_is_short_and_stable() {
        let a = fingerprint("NOT JSON");
        assert_eq!(a.len(), 12);
        assert_eq!(a, fingerprint("NOT JSON"));
        assert_ne!(a, fingerprint("NOT JSON!"));
    }
}
