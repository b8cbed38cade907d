//! Loader configuration
//!
//! A flat TOML property file. Every required property is checked up front so
//! a bad configuration fails the run before any file is touched.

use crate::error::{LoaderError, LoaderResult};
use crate::services::opentsdb_client::DEFAULT_API_PUT;
use crate::store::OutputPaths;
use picu_common::logging::LoggingConfig;
use picu_common::time::TimestampZone;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Module name used for config file resolution
pub const MODULE_NAME: &str = "picu-loader";

/// Environment variable overriding `opentsdb_url`
pub const OPENTSDB_URL_ENV: &str = "PICU_OPENTSDB_URL";

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Property file as written; every key optional until validated
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawLoaderConfig {
    pub opentsdb_url: Option<String>,
    pub api_put: Option<String>,
    pub measurement_catalog: Option<PathBuf>,
    pub subject_registry: Option<PathBuf>,
    pub target_registry: Option<PathBuf>,
    pub processed_ledger: Option<PathBuf>,
    pub root_dir: Option<PathBuf>,
    pub target_location_prefix: Option<String>,
    pub utc_offset_minutes: Option<i32>,
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Validated configuration
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub opentsdb_url: String,
    pub api_put: String,
    pub measurement_catalog: PathBuf,
    pub outputs: OutputPaths,
    pub root_dir: PathBuf,
    pub target_location_prefix: String,
    pub timestamp_zone: TimestampZone,
    pub request_timeout: Duration,
    pub logging: LoggingConfig,
}

impl LoaderConfig {
    /// Read and validate a config file, applying the environment override
    pub fn load(path: &Path) -> LoaderResult<Self> {
        let raw: RawLoaderConfig = picu_common::config::read_toml_config(path)
            .map_err(|e| LoaderError::config("config", e.to_string()))?;
        let url_override = std::env::var(OPENTSDB_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty());
        Self::from_raw(raw, url_override)
    }

    /// Validate raw properties
    pub fn from_raw(raw: RawLoaderConfig, url_override: Option<String>) -> LoaderResult<Self> {
        let opentsdb_url = url_override
            .or(raw.opentsdb_url)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| missing("opentsdb_url"))?;

        let measurement_catalog = required_path(raw.measurement_catalog, "measurement_catalog")?;
        if !measurement_catalog.is_file() {
            return Err(LoaderError::config(
                "measurement_catalog",
                format!("{} is not a readable file", measurement_catalog.display()),
            ));
        }

        let root_dir = required_path(raw.root_dir, "root_dir")?;
        if !root_dir.is_dir() {
            return Err(LoaderError::config(
                "root_dir",
                format!("{} is not a directory", root_dir.display()),
            ));
        }

        let target_location_prefix = raw
            .target_location_prefix
            .map(|prefix| prefix.trim().to_string())
            .filter(|prefix| !prefix.is_empty())
            .ok_or_else(|| missing("target_location_prefix"))?;

        let outputs = OutputPaths {
            subject_registry: required_path(raw.subject_registry, "subject_registry")?,
            target_registry: required_path(raw.target_registry, "target_registry")?,
            processed_ledger: required_path(raw.processed_ledger, "processed_ledger")?,
        };

        let timestamp_zone = TimestampZone::from_offset_minutes(raw.utc_offset_minutes)
            .map_err(|e| LoaderError::config("utc_offset_minutes", e.to_string()))?;

        let timeout_secs = raw
            .request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(LoaderError::config(
                "request_timeout_secs",
                "must be greater than zero",
            ));
        }

        Ok(Self {
            opentsdb_url,
            api_put: raw.api_put.unwrap_or_else(|| DEFAULT_API_PUT.to_string()),
            measurement_catalog,
            outputs,
            root_dir,
            target_location_prefix,
            timestamp_zone,
            request_timeout: Duration::from_secs(timeout_secs),
            logging: raw.logging,
        })
    }
}

fn missing(property: &str) -> LoaderError {
    LoaderError::config(property, "required property is missing")
}

fn required_path(value: Option<PathBuf>, property: &str) -> LoaderResult<PathBuf> {
    value
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| missing(property))
}
