//! Subject record: one de-identified patient across all processed files

use once_cell::sync::OnceCell;
use sha2::{Digest, Sha256};

/// Demographic identity tuple
///
/// Missing fields are empty strings. The subject key is a function of exactly
/// these five fields, in this order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Demographics {
    pub first_name: String,
    pub last_name: String,
    pub birth_date_time: String,
    pub gender: String,
    pub birthplace: String,
}

impl Demographics {
    /// Fields concatenated with no delimiter
    pub fn concatenation(&self) -> String {
        [
            self.first_name.as_str(),
            self.last_name.as_str(),
            self.birth_date_time.as_str(),
            self.gender.as_str(),
            self.birthplace.as_str(),
        ]
        .concat()
    }
}

/// SHA-256 of the concatenated demographics, hex-encoded and markup-escaped
pub fn derive_subject_key(demographics: &Demographics) -> String {
    let digest = Sha256::digest(demographics.concatenation().as_bytes());
    escape_markup(&format!("{:x}", digest))
}

fn escape_markup(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Persisted per-subject record
///
/// Demographics are fixed at construction. Locations and variables only grow,
/// the target-population flag is never cleared and the earliest observation
/// time is written once.
#[derive(Debug, Clone)]
pub struct SubjectRecord {
    demographics: Demographics,
    subject_key: OnceCell<String>,
    is_target_population: bool,
    earliest_observation_time: Option<String>,
    locations: Vec<String>,
    variables: Vec<String>,
}

impl SubjectRecord {
    /// Fresh record with empty location/variable sets
    pub fn new(demographics: Demographics) -> Self {
        Self {
            demographics,
            subject_key: OnceCell::new(),
            is_target_population: false,
            earliest_observation_time: None,
            locations: Vec::new(),
            variables: Vec::new(),
        }
    }

    /// Rebuild a record from a registry snapshot row
    ///
    /// Duplicate list entries are dropped, keeping first occurrence order.
    pub fn restore(
        demographics: Demographics,
        is_target_population: bool,
        earliest_observation_time: Option<String>,
        locations: Vec<String>,
        variables: Vec<String>,
    ) -> Self {
        let mut record = Self::new(demographics);
        record.is_target_population = is_target_population;
        record.earliest_observation_time = earliest_observation_time.filter(|t| !t.is_empty());
        for location in locations {
            insert_unique(&mut record.locations, &location);
        }
        for variable in variables {
            insert_unique(&mut record.variables, &variable);
        }
        record
    }

    /// Stable subject key, computed on first request
    pub fn subject_key(&self) -> &str {
        self.subject_key
            .get_or_init(|| derive_subject_key(&self.demographics))
    }

    pub fn demographics(&self) -> &Demographics {
        &self.demographics
    }

    pub fn is_target_population(&self) -> bool {
        self.is_target_population
    }

    pub fn earliest_observation_time(&self) -> Option<&str> {
        self.earliest_observation_time.as_deref()
    }

    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Record a visit location
    ///
    /// Returns true if the code was new. A newly added code starting with
    /// `target_prefix` marks the subject as target population.
    pub fn add_location(&mut self, code: &str, target_prefix: &str) -> bool {
        if !insert_unique(&mut self.locations, code) {
            return false;
        }
        if !target_prefix.is_empty() && code.starts_with(target_prefix) {
            self.is_target_population = true;
        }
        true
    }

    /// Record a canonical metric name; returns true if it was new
    pub fn add_variable(&mut self, metric_name: &str) -> bool {
        insert_unique(&mut self.variables, metric_name)
    }

    /// Set the earliest observation time if it is still unset
    ///
    /// Returns true if this call set it.
    pub fn record_observation_time(&mut self, time_point: &str) -> bool {
        if self.earliest_observation_time.is_some() {
            return false;
        }
        self.earliest_observation_time = Some(time_point.to_string());
        true
    }
}

fn insert_unique(items: &mut Vec<String>, value: &str) -> bool {
    if items.iter().any(|existing| existing == value) {
        return false;
    }
    items.push(value.to_string());
    true
}
