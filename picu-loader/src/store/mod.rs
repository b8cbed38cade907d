//! Reference tables and run outputs
//!
//! CSV reference tables in, registry snapshots and the processed-file ledger
//! out. Nothing is written until the end of a run, see [`persist_outputs`].

pub mod catalog;
pub mod ledger;
pub mod persistence;
pub mod registry_snapshot;
pub mod staging;

pub use catalog::load_measurement_catalog;
pub use ledger::ProcessedFileLedger;
pub use persistence::{persist_outputs, OutputPaths};
pub use registry_snapshot::{load_registry, write_registry, REGISTRY_HEADERS};
pub use staging::OutputBatch;
