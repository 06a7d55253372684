//! # Views
//! Turns the aggregated frequency maps into plain row sequences for a charting
//! consumer. Row order is the first-seen order of each key.

use serde::Serialize;

use crate::aggregate::{time_bucket, Aggregates, EndpointKey, FrequencyMap};
use crate::ingest::types::PortValue;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRow {
    pub category: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeBucketRow {
    /// `YYYY-MM-DDTHH:MM`, UTC.
    pub timestamp: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointRow {
    pub src_ip: String,
    pub dest_port: PortValue,
    pub count: u64,
}

/// The three immutable views handed to the renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardViews {
    pub categories: Vec<CategoryRow>,
    pub timeline: Vec<TimeBucketRow>,
    pub endpoints: Vec<EndpointRow>,
}

impl DashboardViews {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.timeline.is_empty() && self.endpoints.is_empty()
    }
}

pub fn category_rows(map: FrequencyMap<String>) -> Vec<CategoryRow> {
    map.into_iter()
        .map(|(category, count)| CategoryRow { category, count })
        .collect()
}

pub fn time_rows(map: FrequencyMap<DateTime<Utc>>) -> Vec<TimeBucketRow> {
    map.into_iter()
        .map(|(bucket, count)| TimeBucketRow {
            timestamp: time_bucket::format_bucket(&bucket),
            count,
        })
        .collect()
}

pub fn endpoint_rows(map: FrequencyMap<EndpointKey>) -> Vec<EndpointRow> {
    map.into_iter()
        .map(|(EndpointKey { src_ip, dest_port }, count)| EndpointRow {
            src_ip,
            dest_port,
            count,
        })
        .collect()
}

pub fn materialize(aggregates: Aggregates) -> DashboardViews {
    DashboardViews {
        categories: category_rows(aggregates.categories),
        timeline: time_rows(aggregates.time_buckets),
        endpoints: endpoint_rows(aggregates.endpoints),
    }
}
