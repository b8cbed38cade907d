//! picu-loader library interface
//!
//! Incremental loader for HL7 v2 vital-sign messages: reconciles a directory
//! against the processed-file ledger, links each message to a de-identified
//! subject, normalizes observation channels to metric names and sends one data
//! point per observation to OpenTSDB.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use crate::config::LoaderConfig;
pub use crate::error::{LoaderError, LoaderResult};
pub use crate::services::{LoadOrchestrator, RunOptions, RunSummary};
