// src/aggregate/mod.rs
//! The three aggregators: each folds the same record slice into its own
//! frequency map. They share nothing, so they can run side by side.

pub mod frequency;
pub mod time_bucket;

use chrono::{DateTime, Utc};
use std::hash::Hash;
use std::panic;

use crate::ingest::types::{AlertRecord, PortValue};

pub use frequency::FrequencyMap;

/// A `(src_ip, dest_port)` pairing, kept as a real pair so no delimiter can
/// collide with field content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointKey {
    pub src_ip: String,
    pub dest_port: PortValue,
}

/// A pure fold from records to counts under a derived key.
pub trait Aggregator {
    type Key: Clone + Eq + Hash;

    /// The key this record contributes, or `None` when a needed field is absent.
    fn key_for(&self, record: &AlertRecord) -> Option<Self::Key>;

    fn fold<'a, I>(&self, records: I) -> FrequencyMap<Self::Key>
    where
        I: IntoIterator<Item = &'a AlertRecord>,
    {
        records
            .into_iter()
            .filter_map(|r| self.key_for(r))
            .collect()
    }
}

/// Counts per `alert.category`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryAggregator;

impl Aggregator for CategoryAggregator {
    type Key = String;

    fn key_for(&self, record: &AlertRecord) -> Option<String> {
        record.category().map(str::to_string)
    }
}

/// Counts per minute of `timestamp` (UTC). Unparseable timestamps are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeBucketAggregator;

impl Aggregator for TimeBucketAggregator {
    type Key = DateTime<Utc>;

    fn key_for(&self, record: &AlertRecord) -> Option<DateTime<Utc>> {
        record.timestamp.as_deref().and_then(time_bucket::bucket_of)
    }
}

/// Counts per `(src_ip, dest_port)`; both fields are required.
#[derive(Debug, Clone, Copy, Default)]
pub struct EndpointAggregator;

impl Aggregator for EndpointAggregator {
    type Key = EndpointKey;

    fn key_for(&self, record: &AlertRecord) -> Option<EndpointKey> {
        match (&record.src_ip, &record.dest_port) {
            (Some(ip), Some(port)) => Some(EndpointKey {
                src_ip: ip.clone(),
                dest_port: port.clone(),
            }),
            _ => None,
        }
    }
}

/// Output of one aggregation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregates {
    pub categories: FrequencyMap<String>,
    pub time_buckets: FrequencyMap<DateTime<Utc>>,
    pub endpoints: FrequencyMap<EndpointKey>,
}

/// Run the three folds one after another.
pub fn aggregate(records: &[AlertRecord]) -> Aggregates {
    Aggregates {
        categories: CategoryAggregator.fold(records),
        time_buckets: TimeBucketAggregator.fold(records),
        endpoints: EndpointAggregator.fold(records),
    }
}

/// Run the three folds on scoped threads over the same borrowed slice.
/// Produces exactly what [`aggregate`] produces.
pub fn aggregate_parallel(records: &[AlertRecord]) -> Aggregates {
    std::thread::scope(|scope| {
        let categories = scope.spawn(|| CategoryAggregator.fold(records));
        let time_buckets = scope.spawn(|| TimeBucketAggregator.fold(records));
        let endpoints = scope.spawn(|| EndpointAggregator.fold(records));

        Aggregates {
            categories: categories
                .join()
                .unwrap_or_else(|err| panic::resume_unwind(err)),
            time_buckets: time_buckets
                .join()
                .unwrap_or_else(|err| panic::resume_unwind(err)),
            endpoints: endpoints
                .join()
                .unwrap_or_else(|err| panic::resume_unwind(err)),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::parse_line;

    fn recs(lines: &[&str]) -> Vec<AlertRecord> {
        lines.iter().map(|l| parse_line(l).unwrap()).collect()
    }

    #[test]
    fn category_skips_missing() {
        let r = recs(&[
            r#"{"alert":{"category":"A"}}"#,
            r#"{"alert":{}}"#,
            r#"{"alert":{"category":"B"}}"#,
            r#"{"alert":{"category":"A"}}"#,
        ]);
        let m = CategoryAggregator.fold(&r);
        let v: Vec<_> = m.into_iter().collect();
        assert_eq!(v, vec![("A".to_string(), 2), ("B".to_string(), 1)]);
    }

    #[test]
    fn time_bucket_groups_by_minute_and_skips_bad() {
        let r = recs(&[
            r#"{"timestamp":"2024-01-01T00:00:30Z"}"#,
            r#"{"timestamp":"2024-01-01T00:00:59.999Z"}"#,
            r#"{"timestamp":"not a date"}"#,
            r#"{"timestamp":"2024-01-01T00:01:00Z"}"#,
        ]);
        let m = TimeBucketAggregator.fold(&r);
        let v: Vec<_> = m
            .iter()
            .map(|(k, n)| (time_bucket::format_bucket(k), n))
            .collect();
        assert_eq!(
            v,
            vec![
                ("2024-01-01T00:00".to_string(), 2),
                ("2024-01-01T00:01".to_string(), 1)
            ]
        );
    }

    #[test]
    fn endpoint_needs_both_fields_and_merges_numeric_port_forms() {
        let r = recs(&[
            r#"{"src_ip":"10.0.0.1","dest_port":443}"#,
            r#"{"src_ip":"10.0.0.1","dest_port":"443"}"#,
            r#"{"src_ip":"10.0.0.1"}"#,
            r#"{"dest_port":443}"#,
            r#"{"src_ip":"10.0.0.1","dest_port":0}"#,
        ]);
        let m = EndpointAggregator.fold(&r);
        assert_eq!(m.len(), 1);
        let key = EndpointKey {
            src_ip: "10.0.0.1".into(),
            dest_port: PortValue::Number(443),
        };
        assert_eq!(m.get(&key), Some(2));
    }

    #[test]
    fn missing_field_only_affects_its_own_aggregator() {
        let r = recs(&[r#"{"timestamp":"2024-01-01T00:00:30Z"}"#]);
        let a = aggregate(&r);
        assert!(a.categories.is_empty());
        assert!(a.endpoints.is_empty());
        assert_eq!(a.time_buckets.total(), 1);
    }

    #[test]
    fn parallel_matches_sequential() {
        let r = recs(&[
            r#"{"timestamp":"2024-01-01T00:00:30Z","alert":{"category":"A"},"src_ip":"1.1.1.1","dest_port":53}"#,
            r#"{"timestamp":"2024-01-01T00:02:00Z","alert":{"category":"B"},"src_ip":"2.2.2.2","dest_port":"ssh"}"#,
            r#"{"alert":{"category":"A"},"src_ip":"1.1.1.1","dest_port":53}"#,
        ]);
        assert_eq!(aggregate(&r), aggregate_parallel(&r));
    }

    #[test]
    fn empty_input_gives_empty_maps() {
        let a = aggregate_parallel(&[]);
        assert_eq!(a, Aggregates::default());
    }
}
