//! Time-series sink
//!
//! Data points are posted one at a time to the OpenTSDB put endpoint as JSON.
//! A point that cannot be delivered is [`LoaderError::SinkUnavailable`], which
//! aborts the run before anything is persisted.

use crate::error::{LoaderError, LoaderResult};
use crate::models::DataPoint;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const USER_AGENT: &str = concat!("picu-loader/", env!("CARGO_PKG_VERSION"));

/// Default put endpoint path
pub const DEFAULT_API_PUT: &str = "/api/put";

/// Destination for emitted data points
#[async_trait]
pub trait TimeSeriesSink: Send + Sync {
    /// Durably store one point
    async fn store(&self, point: &DataPoint) -> LoaderResult<()>;
}

/// OpenTSDB HTTP client
pub struct OpenTsdbClient {
    http_client: reqwest::Client,
    put_url: String,
}

impl OpenTsdbClient {
    /// `base_url` is the server root, `api_put` the endpoint path appended to it
    pub fn new(base_url: &str, api_put: &str, timeout: Duration) -> LoaderResult<Self> {
        let put_url = join_url(base_url, api_put);
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| LoaderError::SinkUnavailable {
                url: put_url.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            http_client,
            put_url,
        })
    }

    pub fn put_url(&self) -> &str {
        &self.put_url
    }

    fn unavailable(&self, reason: impl Into<String>) -> LoaderError {
        LoaderError::SinkUnavailable {
            url: self.put_url.clone(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl TimeSeriesSink for OpenTsdbClient {
    async fn store(&self, point: &DataPoint) -> LoaderResult<()> {
        let response = self
            .http_client
            .post(&self.put_url)
            .json(point)
            .send()
            .await
            .map_err(|e| self.unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.unavailable(format!("HTTP {}: {}", status.as_u16(), body.trim())));
        }

        tracing::trace!(metric = %point.metric(), timestamp = point.timestamp(), "Stored data point");
        Ok(())
    }
}

/// Sink for `--dry-run`: logs and counts points without sending them
#[derive(Debug, Default)]
pub struct DryRunSink {
    stored: AtomicUsize,
}

impl DryRunSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(&self) -> usize {
        self.stored.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TimeSeriesSink for DryRunSink {
    async fn store(&self, point: &DataPoint) -> LoaderResult<()> {
        self.stored.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            metric = %point.metric(),
            timestamp = point.timestamp(),
            value = point.value(),
            subject_key = %point.subject_key().unwrap_or_default(),
            "Dry run: data point not sent"
        );
        Ok(())
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    if path.is_empty() {
        return base_url.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://tsdb:4242", "/api/put"), "http://tsdb:4242/api/put");
        assert_eq!(join_url("http://tsdb:4242/", "api/put"), "http://tsdb:4242/api/put");
        assert_eq!(join_url("http://tsdb:4242/", ""), "http://tsdb:4242/");
    }

    #[test]
    fn test_client_put_url() {
        let client =
            OpenTsdbClient::new("http://localhost:4242", DEFAULT_API_PUT, Duration::from_secs(5))
                .unwrap();
        assert_eq!(client.put_url(), "http://localhost:4242/api/put");
    }

    #[tokio::test]
    async fn test_dry_run_sink_counts() {
        let sink = DryRunSink::new();
        let point = DataPoint::for_subject("vitals.perMin.HeartRate", 1, 112.0, "abc");
        sink.store(&point).await.unwrap();
        sink.store(&point).await.unwrap();
        assert_eq!(sink.stored(), 2);
    }
}
