//! Message ingestion driver
//!
//! Sequential pass over one file: every message unit is resolved to a subject,
//! its observations are normalized and each one becomes a data point sent to
//! the sink. Unit and observation failures are recovered locally; sink and
//! read failures propagate and abort the run.

use crate::error::{LoaderError, LoaderResult};
use crate::models::{DataPoint, Demographics};
use crate::services::identity_resolver::{IdentityResolver, SubjectRegistry};
use crate::services::measurement_normalizer::MeasurementNormalizer;
use crate::services::message_source::{FieldPath, Hl7Message, MessageSource, Segment};
use crate::services::opentsdb_client::TimeSeriesSink;
use picu_common::time::{format_time_point, parse_hl7_timestamp, TimestampZone};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Field addresses read from each message unit
pub mod fields {
    use super::FieldPath;

    pub const FIRST_NAME: FieldPath = FieldPath::component("PID", 5, 2);
    pub const LAST_NAME: FieldPath = FieldPath::component("PID", 5, 1);
    pub const BIRTH_DATE_TIME: FieldPath = FieldPath::component("PID", 7, 1);
    pub const GENDER: FieldPath = FieldPath::component("PID", 8, 1);
    pub const BIRTHPLACE: FieldPath = FieldPath::component("PID", 23, 1);
    pub const VISIT_LOCATION: FieldPath = FieldPath::component("PV1", 3, 1);
    pub const OBSERVATION_TIME: FieldPath = FieldPath::component("OBR", 7, 1);
    pub const CHANNEL: FieldPath = FieldPath::component("OBX", 3, 1);
    pub const VALUE: FieldPath = FieldPath::component("OBX", 5, 1);
    pub const UNIT: FieldPath = FieldPath::component("OBX", 6, 1);
}

/// Counters for one ingested file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileIngestStats {
    pub units_ingested: usize,
    pub units_skipped: usize,
    pub points_emitted: usize,
    pub observations_skipped: usize,
}

impl std::ops::AddAssign for FileIngestStats {
    fn add_assign(&mut self, other: Self) {
        self.units_ingested += other.units_ingested;
        self.units_skipped += other.units_skipped;
        self.points_emitted += other.points_emitted;
        self.observations_skipped += other.observations_skipped;
    }
}

/// Drives resolver, normalizer and sink over the units of a file
pub struct IngestionDriver {
    resolver: IdentityResolver,
    normalizer: MeasurementNormalizer,
    source: Box<dyn MessageSource>,
    sink: Arc<dyn TimeSeriesSink>,
    zone: TimestampZone,
}

impl IngestionDriver {
    pub fn new(
        resolver: IdentityResolver,
        normalizer: MeasurementNormalizer,
        source: Box<dyn MessageSource>,
        sink: Arc<dyn TimeSeriesSink>,
        zone: TimestampZone,
    ) -> Self {
        Self {
            resolver,
            normalizer,
            source,
            sink,
            zone,
        }
    }

    /// Ingest every message unit of `path` into `registry`
    ///
    /// Returns an error only for fatal conditions (unreadable file, sink
    /// failure); the registry may then hold partial updates and must not be
    /// persisted.
    pub async fn ingest(
        &self,
        path: &Path,
        registry: &mut SubjectRegistry,
    ) -> LoaderResult<FileIngestStats> {
        let units = self.source.read_units(path)?;
        let mut stats = FileIngestStats::default();

        for (index, unit) in units.into_iter().enumerate() {
            let number = index + 1;
            let outcome = match unit {
                Ok(message) => {
                    self.ingest_unit(path, number, &message, registry, &mut stats)
                        .await
                }
                Err(e) => Err(malformed(path, number, e.to_string())),
            };

            match outcome {
                Ok(()) => stats.units_ingested += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(error = %e, "Skipping message unit");
                    stats.units_skipped += 1;
                }
            }
        }

        debug!(
            path = %path.display(),
            units = stats.units_ingested,
            skipped = stats.units_skipped,
            points = stats.points_emitted,
            "Ingested file"
        );
        Ok(stats)
    }

    async fn ingest_unit(
        &self,
        path: &Path,
        number: usize,
        message: &Hl7Message,
        registry: &mut SubjectRegistry,
        stats: &mut FileIngestStats,
    ) -> LoaderResult<()> {
        let demographics = extract_demographics(message)
            .ok_or_else(|| malformed(path, number, "no PID segment"))?;

        // Validate the unit before any subject is created or touched
        let raw_time = message
            .get(&fields::OBSERVATION_TIME)
            .ok_or_else(|| malformed(path, number, format!("{} is empty", fields::OBSERVATION_TIME)))?;
        let instant = parse_hl7_timestamp(&raw_time, self.zone)
            .map_err(|e| malformed(path, number, e.to_string()))?;
        let timestamp_ms = instant.timestamp_millis();

        let record = self.resolver.resolve(registry, demographics);
        record.record_observation_time(&format_time_point(&instant));

        let location = message
            .get(&fields::VISIT_LOCATION)
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        if let Some(location) = location {
            self.resolver.register_location(record, &location);
        }

        for observation in message.order_observations() {
            // A known channel is a variable of the subject even when its value is unusable
            let measured = self.metric_of(message, observation).and_then(|metric| {
                record.add_variable(&metric);
                let value = self.value_of(message, observation)?;
                Ok((metric, value))
            });
            let (metric, value) = match measured {
                Ok(measured) => measured,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    debug!(subject_key = %record.subject_key(), error = %e, "Skipping observation");
                    stats.observations_skipped += 1;
                    continue;
                }
            };

            let point = DataPoint::for_subject(&metric, timestamp_ms, value, record.subject_key());
            self.sink.store(&point).await?;
            stats.points_emitted += 1;
        }

        Ok(())
    }

    /// Canonical metric name of one OBX segment
    fn metric_of(&self, message: &Hl7Message, observation: &Segment) -> LoaderResult<String> {
        let channel = read_trimmed(message, observation, &fields::CHANNEL).unwrap_or_default();
        let unit = read_trimmed(message, observation, &fields::UNIT);
        self.normalizer.normalize(&channel, unit.as_deref())
    }

    /// Finite numeric value of one OBX segment
    fn value_of(&self, message: &Hl7Message, observation: &Segment) -> LoaderResult<f64> {
        let raw_value = read_trimmed(message, observation, &fields::VALUE).unwrap_or_default();
        raw_value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| LoaderError::InvalidMeasurement {
                channel: read_trimmed(message, observation, &fields::CHANNEL).unwrap_or_default(),
                value: raw_value.clone(),
            })
    }
}

fn read_trimmed(message: &Hl7Message, observation: &Segment, path: &FieldPath) -> Option<String> {
    message.get_in(observation, path).map(|v| v.trim().to_string())
}

/// Demographics of the first PID segment; `None` without one
pub fn extract_demographics(message: &Hl7Message) -> Option<Demographics> {
    message.segment("PID")?;
    let read = |path: &FieldPath| {
        message
            .get(path)
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    };

    Some(Demographics {
        first_name: read(&fields::FIRST_NAME),
        last_name: read(&fields::LAST_NAME),
        birth_date_time: read(&fields::BIRTH_DATE_TIME),
        gender: read(&fields::GENDER),
        birthplace: read(&fields::BIRTHPLACE),
    })
}

fn malformed(path: &Path, index: usize, reason: impl Into<String>) -> LoaderError {
    LoaderError::MalformedMessageUnit {
        path: path.to_path_buf(),
        index,
        reason: reason.into(),
    }
}
