//! Measurement normalizer
//!
//! Maps a raw observation channel code and unit code to a canonical dotted
//! metric name: `vitals.<unit>.<Label>`.
//!
//! # Algorithm
//! 1. Look the channel up in the catalog; if absent, replace its first digit
//!    with [`WILDCARD_MARKER`] and look again. Still absent → UnknownChannel.
//! 2. Split the label into words, capitalize each and join them (CamelCase).
//! 3. Apply the unit substitutions in order, case-insensitively, then lower
//!    the first character.

use crate::error::{LoaderError, LoaderResult};
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex, RegexBuilder};
use std::collections::HashMap;

/// Replaces the first digit of a channel code on the retry lookup
pub const WILDCARD_MARKER: char = '#';

/// First segment of every metric name
pub const METRIC_NAMESPACE: &str = "vitals";

/// Literal unit substitutions, applied in this order
const UNIT_SUBSTITUTIONS: [(&str, &str); 6] = [
    ("min", "Min"),
    ("/", "Per"),
    ("%", "percent"),
    ("#", "Count"),
    ("cel", "Celsius"),
    ("mm(hg)", "mmHg"),
];

static UNIT_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    UNIT_SUBSTITUTIONS
        .iter()
        .map(|(pattern, replacement)| {
            let regex = RegexBuilder::new(&regex::escape(pattern))
                .case_insensitive(true)
                .build()
                .expect("escaped literal is a valid pattern");
            (regex, *replacement)
        })
        .collect()
});

/// Channel code → human-readable label, loaded once per run
#[derive(Debug, Clone, Default)]
pub struct MeasurementCatalog {
    labels: HashMap<String, String>,
}

impl MeasurementCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry; a later entry for the same code replaces the earlier one
    pub fn insert(&mut self, code: impl Into<String>, label: impl Into<String>) {
        self.labels.insert(code.into(), label.into());
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label for a channel code, retrying once with the digit wildcard
    pub fn label_for(&self, code: &str) -> Option<&str> {
        if let Some(label) = self.labels.get(code) {
            return Some(label);
        }
        let wildcard = wildcard_code(code)?;
        self.labels.get(&wildcard).map(String::as_str)
    }
}

impl<C, L> FromIterator<(C, L)> for MeasurementCatalog
where
    C: Into<String>,
    L: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (C, L)>>(iter: I) -> Self {
        let mut catalog = MeasurementCatalog::new();
        for (code, label) in iter {
            catalog.insert(code, label);
        }
        catalog
    }
}

/// Code with its first ASCII digit replaced by the wildcard marker
pub fn wildcard_code(code: &str) -> Option<String> {
    let index = code.find(|c: char| c.is_ascii_digit())?;
    let mut wildcard = String::with_capacity(code.len());
    wildcard.push_str(&code[..index]);
    wildcard.push(WILDCARD_MARKER);
    wildcard.push_str(&code[index + 1..]);
    Some(wildcard)
}

/// Label words capitalized and joined
///
/// Words are separated by whitespace or hyphens. Characters a metric name
/// cannot carry are dropped.
pub fn camel_case_label(label: &str) -> String {
    label
        .split(|c: char| c.is_whitespace() || c == '-')
        .map(metric_safe)
        .filter(|token| !token.is_empty())
        .map(|token| capitalize(&token))
        .collect()
}

/// Unit segment of the metric name; an absent unit gives an empty segment
pub fn canonical_unit(unit: Option<&str>) -> String {
    let Some(unit) = unit else {
        return String::new();
    };
    let substituted = UNIT_PATTERNS
        .iter()
        .fold(unit.to_string(), |acc, (regex, replacement)| {
            regex.replace_all(&acc, NoExpand(*replacement)).into_owned()
        });
    uncapitalize(&metric_safe(&substituted))
}

fn metric_safe(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn uncapitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Measurement normalizer backed by a read-only catalog
pub struct MeasurementNormalizer {
    catalog: MeasurementCatalog,
}

impl MeasurementNormalizer {
    pub fn new(catalog: MeasurementCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &MeasurementCatalog {
        &self.catalog
    }

    /// Canonical metric name for one observation
    ///
    /// # Errors
    /// `UnknownChannel` when the code (and its wildcard form) is not catalogued.
    pub fn normalize(&self, channel_code: &str, unit_code: Option<&str>) -> LoaderResult<String> {
        let label = self
            .catalog
            .label_for(channel_code)
            .ok_or_else(|| LoaderError::UnknownChannel(channel_code.to_string()))?;

        Ok(format!(
            "{}.{}.{}",
            METRIC_NAMESPACE,
            canonical_unit(unit_code),
            camel_case_label(label)
        ))
    }
}
