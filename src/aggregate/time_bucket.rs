//! Timestamp parsing and minute truncation for the timeline view.
//!
//! Every accepted form is converted to UTC before truncation, so records
//! written with different offsets land in the same bucket when they describe
//! the same instant. Inputs without an offset are read as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};

/// Output format of a bucket key: ISO-8601 without seconds or zone.
pub const BUCKET_FORMAT: &str = "%Y-%m-%dT%H:%M";

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse an alert timestamp. Returns `None` for anything unrecognised.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for f in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, f) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    let naive = s.strip_suffix('Z').unwrap_or(s);
    for f in NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(naive, f) {
            return Some(ndt.and_utc());
        }
    }
    NaiveDate::parse_from_str(naive, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
}

/// Drop seconds and sub-seconds.
pub fn truncate_to_minute(dt: DateTime<Utc>) -> Option<DateTime<Utc>> {
    dt.with_second(0)?.with_nanosecond(0)
}

/// Parse and truncate in one step.
pub fn bucket_of(raw: &str) -> Option<DateTime<Utc>> {
    parse_timestamp(raw).and_then(truncate_to_minute)
}

pub fn format_bucket(bucket: &DateTime<Utc>) -> String {
    bucket.format(BUCKET_FORMAT).to_string()
}
