// src/ingest/types.rs
use anyhow::Result;
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::Utf8Error;

/// One non-blank physical line of the raw payload. Kept as bytes so a line
/// with broken UTF-8 fails on its own instead of poisoning the whole payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawLine<'a> {
    /// 1-based line number in the raw payload (blank lines still count).
    pub number: usize,
    pub bytes: &'a [u8],
}

impl<'a> RawLine<'a> {
    pub fn text(&self) -> Result<&'a str, Utf8Error> {
        std::str::from_utf8(self.bytes)
    }
}

/// A single alert event. Every field is optional; absence only excludes the
/// record from the views that need that field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AlertRecord {
    #[serde(default, deserialize_with = "non_empty_string")]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub alert: Option<AlertDetails>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub src_ip: Option<String>,
    #[serde(default, deserialize_with = "lenient_port")]
    pub dest_port: Option<PortValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AlertDetails {
    #[serde(default, deserialize_with = "non_empty_string")]
    pub category: Option<String>,
}

impl AlertRecord {
    pub fn category(&self) -> Option<&str> {
        self.alert.as_ref().and_then(|a| a.category.as_deref())
    }
}

/// Destination port as it appeared in the log: numeric, or free text when the
/// producer wrote something that is not a canonical integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PortValue {
    Number(i64),
    Text(String),
}

impl PortValue {
    /// Build from a JSON value. `0`, `""`, and non-scalar values are absent.
    /// Integral floats (`443.0`) are numbers; other numbers keep their JSON text.
    pub fn from_json(v: &Value) -> Option<Self> {
        match v {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return (i != 0).then_some(PortValue::Number(i));
                }
                let f = n.as_f64()?;
                if f == 0.0 {
                    None
                } else if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    Some(PortValue::Number(f as i64))
                } else {
                    Some(PortValue::Text(n.to_string()))
                }
            }
            Value::String(s) if !s.is_empty() => Some(Self::from_text(s)),
            _ => None,
        }
    }

    /// `"443"` becomes `Number(443)`; `"0443"` or `"https"` stay text.
    pub fn from_text(s: &str) -> Self {
        match s.parse::<i64>() {
            Ok(n) if n.to_string() == s => PortValue::Number(n),
            _ => PortValue::Text(s.to_string()),
        }
    }
}

impl fmt::Display for PortValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortValue::Number(n) => write!(f, "{n}"),
            PortValue::Text(s) => f.write_str(s),
        }
    }
}

fn non_empty_string<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    })
}

fn lenient<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.and_then(|v| serde_json::from_value(v).ok()))
}

fn lenient_port<'de, D>(d: D) -> Result<Option<PortValue>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().and_then(PortValue::from_json))
}

/// Why a single line could not become an [`AlertRecord`].
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(#[from] Utf8Error),

    #[error("expected a JSON object, found {found}")]
    NotAnObject { found: &'static str },
}

/// A rejected line together with its position and cause.
#[derive(Debug, thiserror::Error)]
#[error("line {line_no}: {source}")]
pub struct ParseFailure {
    pub line_no: usize,
    /// Offending line, lossily decoded.
    pub line: String,
    #[source]
    pub source: RecordError,
}

impl ParseFailure {
    /// Short stable id of the offending line, safe to log instead of the raw text.
    pub fn fingerprint(&self) -> String {
        crate::ingest::fingerprint(&self.line)
    }
}

/// Outcome of parsing a whole payload: the valid records plus every failure.
#[derive(Debug, Default)]
pub struct ParsedBatch {
    pub lines: usize,
    pub records: Vec<AlertRecord>,
    pub failures: Vec<ParseFailure>,
}

/// Why `ingest::run_once` produced no report.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The log source could not deliver a payload.
    #[error("{0:#}")]
    Source(anyhow::Error),

    /// The aggregation task died; never a retrieval problem.
    #[error("aggregation task failed: {0}")]
    Pipeline(#[from] tokio::task::JoinError),
}

/// Retrieval collaborator: produces the raw NDJSON payload as bytes.
#[async_trait::async_trait]
pub trait LogSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<u8>>;
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn port_numbers_in_any_json_number_form() {
        assert_eq!(PortValue::from_json(&json!(443)), Some(PortValue::Number(443)));
        assert_eq!(PortValue::from_json(&json!(-1)), Some(PortValue::Number(-1)));
        assert_eq!(PortValue::from_json(&json!(443.0)), Some(PortValue::Number(443)));
        assert_eq!(
            PortValue::from_json(&json!(443.5)),
            Some(PortValue::Text("443.5".into()))
        );
        assert_eq!(PortValue::from_json(&json!(0)), None);
        assert_eq!(PortValue::from_json(&json!(0.0)), None);
    }

    #[test]
    fn port_text_canonicalisation() {
        assert_eq!(PortValue::from_text("443"), PortValue::Number(443));
        assert_eq!(PortValue::from_text("-1"), PortValue::Number(-1));
        assert_eq!(PortValue::from_text("0443"), PortValue::Text("0443".into()));
        assert_eq!(PortValue::from_text("https"), PortValue::Text("https".into()));
        assert_eq!(PortValue::from_json(&json!("")), None);
        assert_eq!(PortValue::from_json(&json!(true)), None);
    }
}
