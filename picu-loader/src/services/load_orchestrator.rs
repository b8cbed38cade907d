//! One loader pass
//!
//! Load reference data and state, reconcile, ingest each new file in order and
//! persist once at the end. Any fatal error returns before persistence, so the
//! ledger on disk never lists a file whose run did not complete.

use crate::config::LoaderConfig;
use crate::error::LoaderResult;
use crate::services::file_scanner::FileScanner;
use crate::services::identity_resolver::{IdentityResolver, SubjectRegistry};
use crate::services::ingestion_driver::{FileIngestStats, IngestionDriver};
use crate::services::measurement_normalizer::MeasurementNormalizer;
use crate::services::message_source::{Hl7FileSource, MessageSource};
use crate::services::opentsdb_client::{DryRunSink, OpenTsdbClient, TimeSeriesSink};
use crate::store::{
    load_measurement_catalog, load_registry, persist_outputs, OutputBatch, ProcessedFileLedger,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// In-memory state for the duration of a run
#[derive(Debug, Default)]
pub struct LoaderState {
    pub registry: SubjectRegistry,
    pub ledger: ProcessedFileLedger,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Log points instead of sending them; persist nothing
    pub dry_run: bool,
}

/// Outcome of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub files_processed: usize,
    pub units_ingested: usize,
    pub units_skipped: usize,
    pub points_emitted: usize,
    pub observations_skipped: usize,
    pub subjects: usize,
    pub target_subjects: usize,
    pub persisted: bool,
}

impl RunSummary {
    fn record(&mut self, stats: FileIngestStats) {
        self.files_processed += 1;
        self.units_ingested += stats.units_ingested;
        self.units_skipped += stats.units_skipped;
        self.points_emitted += stats.points_emitted;
        self.observations_skipped += stats.observations_skipped;
    }
}

/// Sequences a single reconciliation and ingestion pass
pub struct LoadOrchestrator {
    config: LoaderConfig,
    options: RunOptions,
    sink: Arc<dyn TimeSeriesSink>,
    source: Box<dyn MessageSource>,
}

impl LoadOrchestrator {
    /// Orchestrator with the OpenTSDB sink, or the dry-run sink
    pub fn new(config: LoaderConfig, options: RunOptions) -> LoaderResult<Self> {
        let sink: Arc<dyn TimeSeriesSink> = if options.dry_run {
            Arc::new(DryRunSink::new())
        } else {
            Arc::new(OpenTsdbClient::new(
                &config.opentsdb_url,
                &config.api_put,
                config.request_timeout,
            )?)
        };
        Ok(Self::with_sink(config, options, sink))
    }

    /// Orchestrator with a caller-supplied sink
    pub fn with_sink(
        config: LoaderConfig,
        options: RunOptions,
        sink: Arc<dyn TimeSeriesSink>,
    ) -> Self {
        Self {
            config,
            options,
            sink,
            source: Box::new(Hl7FileSource),
        }
    }

    /// Registry snapshot and ledger from the previous run, if any
    pub fn load_state(&self) -> LoaderResult<LoaderState> {
        let registry = load_registry(&self.config.outputs.subject_registry)?;
        info!(subjects = registry.len(), "Existing subjects");

        let ledger = ProcessedFileLedger::load(&self.config.outputs.processed_ledger)?;
        info!(files = ledger.len(), "Previously processed files");

        Ok(LoaderState { registry, ledger })
    }

    /// Output files plus their staging names, never treated as input
    fn excluded_paths(&self) -> Vec<PathBuf> {
        self.config
            .outputs
            .all()
            .into_iter()
            .flat_map(|path| [path.to_path_buf(), OutputBatch::staging_path(path)])
            .collect()
    }

    /// Run one pass to completion
    pub async fn run(self) -> LoaderResult<RunSummary> {
        let catalog = load_measurement_catalog(&self.config.measurement_catalog)?;
        let mut state = self.load_state()?;
        let mut summary = RunSummary::default();

        let scanner = FileScanner::new().with_excluded(self.excluded_paths());
        let worklist = scanner.reconcile(&self.config.root_dir, &state.ledger)?;

        if worklist.is_empty() {
            info!("Nothing new to process");
            summary.subjects = state.registry.len();
            summary.target_subjects = state.registry.target_population().count();
            return Ok(summary);
        }
        info!(files = worklist.len(), "New files to process");

        let Self {
            config,
            options,
            sink,
            source,
        } = self;

        let driver = IngestionDriver::new(
            IdentityResolver::new(config.target_location_prefix.as_str()),
            MeasurementNormalizer::new(catalog),
            source,
            sink,
            config.timestamp_zone,
        );

        for path in &worklist {
            info!("File: {}", path.display());
            let stats = driver.ingest(path, &mut state.registry).await?;
            summary.record(stats);
            info!(
                subjects = state.registry.len(),
                points = stats.points_emitted,
                "Subjects after file"
            );
        }

        state.ledger.extend(worklist);
        summary.subjects = state.registry.len();
        summary.target_subjects = state.registry.target_population().count();

        if options.dry_run {
            info!("Dry run: registry and ledger not written");
        } else {
            persist_outputs(&config.outputs, &state.registry, &state.ledger)?;
            summary.persisted = true;
        }

        info!(
            files = summary.files_processed,
            units = summary.units_ingested,
            skipped_units = summary.units_skipped,
            points = summary.points_emitted,
            skipped_observations = summary.observations_skipped,
            subjects = summary.subjects,
            target_subjects = summary.target_subjects,
            "Run complete"
        );
        Ok(summary)
    }
}
