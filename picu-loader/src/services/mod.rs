//! Loader services

pub mod file_scanner;
pub mod identity_resolver;
pub mod ingestion_driver;
pub mod load_orchestrator;
pub mod measurement_normalizer;
pub mod message_source;
pub mod opentsdb_client;

pub use file_scanner::{FileScanner, ScanError, MESSAGE_EXTENSIONS};
pub use identity_resolver::{IdentityResolver, SubjectRegistry};
pub use ingestion_driver::{FileIngestStats, IngestionDriver};
pub use load_orchestrator::{LoadOrchestrator, LoaderState, RunOptions, RunSummary};
pub use measurement_normalizer::{MeasurementCatalog, MeasurementNormalizer};
pub use message_source::{FieldPath, Hl7FileSource, Hl7Message, MessageSource};
pub use opentsdb_client::{DryRunSink, OpenTsdbClient, TimeSeriesSink};
