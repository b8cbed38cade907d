//! Test Helper Utilities
//!
//! Shared utilities for testing picu-loader

#![allow(dead_code)]

pub mod fixtures;
pub mod log_capture;
pub mod sinks;

pub use fixtures::{
    oru_message, test_config, write_catalog, Observation, Patient, TARGET_PREFIX,
};
pub use log_capture::{capture_logs, LogCapture};
pub use sinks::{FailingSink, RecordingSink};
