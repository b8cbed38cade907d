//! Time-series sink test doubles

use async_trait::async_trait;
use picu_loader::models::DataPoint;
use picu_loader::services::TimeSeriesSink;
use picu_loader::{LoaderError, LoaderResult};
use std::sync::Mutex;

/// Keeps every stored point in memory
#[derive(Default)]
pub struct RecordingSink {
    points: Mutex<Vec<DataPoint>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> Vec<DataPoint> {
        self.points.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.points.lock().unwrap().len()
    }
}

#[async_trait]
impl TimeSeriesSink for RecordingSink {
    async fn store(&self, point: &DataPoint) -> LoaderResult<()> {
        self.points.lock().unwrap().push(point.clone());
        Ok(())
    }
}

/// Accepts `accept` points, then reports the sink unreachable
pub struct FailingSink {
    accept: usize,
    stored: Mutex<usize>,
}

impl FailingSink {
    pub fn after(accept: usize) -> Self {
        Self {
            accept,
            stored: Mutex::new(0),
        }
    }
}

#[async_trait]
impl TimeSeriesSink for FailingSink {
    async fn store(&self, _point: &DataPoint) -> LoaderResult<()> {
        let mut stored = self.stored.lock().unwrap();
        if *stored >= self.accept {
            return Err(LoaderError::SinkUnavailable {
                url: "http://127.0.0.1:1/api/put".to_string(),
                reason: "connection refused".to_string(),
            });
        }
        *stored += 1;
        Ok(())
    }
}
