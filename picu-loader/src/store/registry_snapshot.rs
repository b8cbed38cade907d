//! Subject registry snapshot (CSV)
//!
//! One header row, then one row per subject in the fixed column order of
//! [`REGISTRY_HEADERS`]. List cells are bracketed and comma separated.

use crate::error::{LoaderError, LoaderResult};
use crate::models::{derive_subject_key, Demographics, SubjectRecord};
use crate::services::identity_resolver::SubjectRegistry;
use std::io;
use std::path::Path;
use tracing::{info, warn};

/// Snapshot column headers
pub const REGISTRY_HEADERS: [&str; 13] = [
    "Count",
    "Target Population",
    "Subject Key",
    "First Name",
    "Last Name",
    "Birth Date/Time",
    "Gender",
    "Birthplace",
    "First Time Point",
    "Location Count",
    "Locations",
    "Variable Count",
    "Variables",
];

mod column {
    pub const TARGET: usize = 1;
    pub const SUBJECT_KEY: usize = 2;
    pub const FIRST_NAME: usize = 3;
    pub const LAST_NAME: usize = 4;
    pub const BIRTH_DATE_TIME: usize = 5;
    pub const GENDER: usize = 6;
    pub const BIRTHPLACE: usize = 7;
    pub const FIRST_TIME_POINT: usize = 8;
    pub const LOCATIONS: usize = 10;
    pub const VARIABLES: usize = 12;
}

/// `[a, b, c]`
pub fn encode_list(items: &[String]) -> String {
    format!("[{}]", items.join(", "))
}

/// Inverse of [`encode_list`]; `[]` and blank cells are empty lists
pub fn decode_list(cell: &str) -> Vec<String> {
    let inner = cell.trim();
    let inner = inner.strip_prefix('[').unwrap_or(inner);
    let inner = inner.strip_suffix(']').unwrap_or(inner);
    inner
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_flag(cell: &str) -> bool {
    matches!(
        cell.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "1"
    )
}

/// Load a registry snapshot; a missing file is an empty registry
///
/// Subject keys are recomputed from the demographic columns.
pub fn load_registry(path: &Path) -> LoaderResult<SubjectRegistry> {
    let mut registry = SubjectRegistry::new();
    if !path.exists() {
        info!(path = %path.display(), "No subject registry yet, starting empty");
        return Ok(registry);
    }

    let config_error = |reason: String| {
        LoaderError::config("subject_registry", format!("{}: {}", path.display(), reason))
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| config_error(e.to_string()))?;

    for record in reader.records() {
        let row = record.map_err(|e| config_error(e.to_string()))?;
        let cell = |index: usize| row.get(index).map(str::trim).unwrap_or_default();

        let demographics = Demographics {
            first_name: cell(column::FIRST_NAME).to_string(),
            last_name: cell(column::LAST_NAME).to_string(),
            birth_date_time: cell(column::BIRTH_DATE_TIME).to_string(),
            gender: cell(column::GENDER).to_string(),
            birthplace: cell(column::BIRTHPLACE).to_string(),
        };

        let stored_key = cell(column::SUBJECT_KEY);
        let subject_key = derive_subject_key(&demographics);
        if !stored_key.is_empty() && stored_key != subject_key {
            warn!(
                stored = %stored_key,
                recomputed = %subject_key,
                "Stored subject key does not match demographics, using recomputed key"
            );
        }

        let first_time_point = Some(cell(column::FIRST_TIME_POINT).to_string());
        let subject = SubjectRecord::restore(
            demographics,
            parse_flag(cell(column::TARGET)),
            first_time_point,
            decode_list(cell(column::LOCATIONS)),
            decode_list(cell(column::VARIABLES)),
        );

        if !registry.insert(subject) {
            warn!(subject_key = %subject_key, "Duplicate subject row in registry, keeping first");
        }
    }

    info!(path = %path.display(), subjects = registry.len(), "Loaded subject registry");
    Ok(registry)
}

/// Write a snapshot of the given records
pub fn write_registry<'a, W, I>(sink: W, records: I) -> csv::Result<()>
where
    W: io::Write,
    I: IntoIterator<Item = &'a SubjectRecord>,
{
    let mut writer = csv::Writer::from_writer(sink);
    writer.write_record(REGISTRY_HEADERS)?;

    for (index, record) in records.into_iter().enumerate() {
        let demographics = record.demographics();
        writer.write_record([
            (index + 1).to_string(),
            record.is_target_population().to_string(),
            record.subject_key().to_string(),
            demographics.first_name.clone(),
            demographics.last_name.clone(),
            demographics.birth_date_time.clone(),
            demographics.gender.clone(),
            demographics.birthplace.clone(),
            record.earliest_observation_time().unwrap_or_default().to_string(),
            record.locations().len().to_string(),
            encode_list(record.locations()),
            record.variables().len().to_string(),
            encode_list(record.variables()),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
