//! Time-series data point

use serde::Serialize;
use std::collections::BTreeMap;

/// Tag carrying the subject key on every point
pub const SUBJECT_TAG: &str = "subjectId";

/// One measurement ready for the time-series sink
///
/// Serializes to the OpenTSDB put format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPoint {
    metric: String,
    timestamp: i64,
    value: f64,
    tags: BTreeMap<String, String>,
}

impl DataPoint {
    /// Point tagged with the subject key
    pub fn for_subject(metric: &str, timestamp_ms: i64, value: f64, subject_key: &str) -> Self {
        let mut tags = BTreeMap::new();
        tags.insert(SUBJECT_TAG.to_string(), subject_key.to_string());
        Self {
            metric: metric.to_string(),
            timestamp: timestamp_ms,
            value,
            tags,
        }
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    /// Epoch milliseconds
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn subject_key(&self) -> Option<&str> {
        self.tags.get(SUBJECT_TAG).map(String::as_str)
    }
}
