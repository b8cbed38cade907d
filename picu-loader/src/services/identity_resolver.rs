//! Identity resolver
//!
//! Links messages to de-identified subjects. The registry is keyed by the
//! subject key derived from the demographic tuple, so two messages with the
//! same five fields always land on the same record.

use crate::models::{Demographics, SubjectRecord};
use std::collections::BTreeMap;
use tracing::debug;

/// All subjects known to this run, ordered by subject key
#[derive(Debug, Clone, Default)]
pub struct SubjectRegistry {
    subjects: BTreeMap<String, SubjectRecord>,
}

impl SubjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn get(&self, subject_key: &str) -> Option<&SubjectRecord> {
        self.subjects.get(subject_key)
    }

    /// Add a record loaded from a snapshot
    ///
    /// Returns false (and keeps the existing record) if the key is taken.
    pub fn insert(&mut self, record: SubjectRecord) -> bool {
        let key = record.subject_key().to_string();
        if self.subjects.contains_key(&key) {
            return false;
        }
        self.subjects.insert(key, record);
        true
    }

    /// Records in ascending subject-key order
    pub fn iter(&self) -> impl Iterator<Item = &SubjectRecord> {
        self.subjects.values()
    }

    /// Records flagged as target population, in key order
    pub fn target_population(&self) -> impl Iterator<Item = &SubjectRecord> {
        self.subjects.values().filter(|r| r.is_target_population())
    }

    fn get_or_create(&mut self, demographics: Demographics) -> &mut SubjectRecord {
        let record = SubjectRecord::new(demographics);
        let key = record.subject_key().to_string();
        self.subjects.entry(key).or_insert_with(|| {
            debug!(subject_key = %record.subject_key(), "New subject");
            record
        })
    }
}

/// Resolves demographics to live subject records
pub struct IdentityResolver {
    target_prefix: String,
}

impl IdentityResolver {
    /// `target_prefix` marks visit locations of the target population
    pub fn new(target_prefix: impl Into<String>) -> Self {
        Self {
            target_prefix: target_prefix.into(),
        }
    }

    /// Look up the subject for these demographics, creating it if absent
    ///
    /// The returned reference is the registry's own record; mutations need no
    /// re-insert.
    pub fn resolve<'r>(
        &self,
        registry: &'r mut SubjectRegistry,
        demographics: Demographics,
    ) -> &'r mut SubjectRecord {
        registry.get_or_create(demographics)
    }

    /// Add a visit location, raising the target flag on a prefix match
    pub fn register_location(&self, record: &mut SubjectRecord, location: &str) -> bool {
        let added = record.add_location(location, &self.target_prefix);
        if added && !self.target_prefix.is_empty() && location.starts_with(&self.target_prefix) {
            debug!(
                subject_key = %record.subject_key(),
                location = %location,
                "Subject matched target population"
            );
        }
        added
    }
}
