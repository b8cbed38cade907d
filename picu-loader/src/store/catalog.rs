//! Measurement catalog reference table
//!
//! CSV with one header row. Column 1 holds the label and column 2 the raw
//! channel code; column 0 is ignored.

use crate::error::{LoaderError, LoaderResult};
use crate::services::measurement_normalizer::MeasurementCatalog;
use std::path::Path;
use tracing::{debug, info};

const LABEL_COLUMN: usize = 1;
const CODE_COLUMN: usize = 2;

/// Load the catalog; a missing or unreadable table is a configuration error
pub fn load_measurement_catalog(path: &Path) -> LoaderResult<MeasurementCatalog> {
    let config_error = |reason: String| {
        LoaderError::config(
            "measurement_catalog",
            format!("{}: {}", path.display(), reason),
        )
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| config_error(e.to_string()))?;

    let mut catalog = MeasurementCatalog::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| config_error(e.to_string()))?;
        let label = record.get(LABEL_COLUMN).map(str::trim).unwrap_or_default();
        let code = record.get(CODE_COLUMN).map(str::trim).unwrap_or_default();
        if label.is_empty() || code.is_empty() {
            debug!(row = row + 2, "Skipping catalog row without code or label");
            continue;
        }
        catalog.insert(code, label);
    }

    info!(path = %path.display(), channels = catalog.len(), "Loaded measurement catalog");
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_catalog() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("channels.csv");
        std::fs::write(
            &path,
            "Id,Label,Code\n\
             1,Heart Rate,0002-4182\n\
             2,,0002-4bb8\n\
             3,Temperature,\n\
             4,\"Mean arterial, invasive\",12#4\n\
             5,Respiratory Rate,0002-5000\n",
        )
        .unwrap();

        let catalog = load_measurement_catalog(&path).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.label_for("0002-4182"), Some("Heart Rate"));
        assert_eq!(catalog.label_for("12#4"), Some("Mean arterial, invasive"));
        assert_eq!(catalog.label_for("0002-4bb8"), None);
    }

    #[test]
    fn test_short_rows_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("channels.csv");
        std::fs::write(&path, "Id,Label,Code\n1,Only label\n2,Pulse,0003\n").unwrap();

        let catalog = load_measurement_catalog(&path).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.label_for("0003"), Some("Pulse"));
    }

    #[test]
    fn test_missing_catalog_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let err = load_measurement_catalog(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, LoaderError::Configuration { .. }));
        assert!(err.to_string().contains("measurement_catalog"));
    }
}
