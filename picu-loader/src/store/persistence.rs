//! End-of-run persistence
//!
//! Both registry views and the ledger are staged first. Registry views are
//! renamed into place before the ledger, so an interrupted commit never marks a
//! file processed without the registry that reflects it.

use super::registry_snapshot::write_registry;
use super::staging::OutputBatch;
use super::ProcessedFileLedger;
use crate::error::{LoaderError, LoaderResult};
use crate::services::identity_resolver::SubjectRegistry;
use std::path::{Path, PathBuf};
use tracing::info;

/// Destinations of the run outputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub subject_registry: PathBuf,
    pub target_registry: PathBuf,
    pub processed_ledger: PathBuf,
}

impl OutputPaths {
    /// All output files, in commit order
    pub fn all(&self) -> [&Path; 3] {
        [
            self.subject_registry.as_path(),
            self.target_registry.as_path(),
            self.processed_ledger.as_path(),
        ]
    }
}

fn render_registry<'a, I>(path: &Path, records: I) -> LoaderResult<Vec<u8>>
where
    I: IntoIterator<Item = &'a crate::models::SubjectRecord>,
{
    let mut buf = Vec::new();
    write_registry(&mut buf, records).map_err(|e| LoaderError::Persistence {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(buf)
}

/// Write all subjects, target-population subjects and the ledger
pub fn persist_outputs(
    paths: &OutputPaths,
    registry: &SubjectRegistry,
    ledger: &ProcessedFileLedger,
) -> LoaderResult<()> {
    let mut batch = OutputBatch::new();

    let all = render_registry(&paths.subject_registry, registry.iter())?;
    batch.stage(&paths.subject_registry, &all)?;

    let targets = render_registry(&paths.target_registry, registry.target_population())?;
    batch.stage(&paths.target_registry, &targets)?;

    batch.stage(&paths.processed_ledger, ledger.render().as_bytes())?;
    batch.commit()?;

    info!(
        subjects = registry.len(),
        target_subjects = registry.target_population().count(),
        ledger_entries = ledger.len(),
        "Persisted registry and ledger"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Demographics, SubjectRecord};
    use crate::store::load_registry;
    use std::fs;
    use tempfile::TempDir;

    fn paths(dir: &Path) -> OutputPaths {
        OutputPaths {
            subject_registry: dir.join("subjects.csv"),
            target_registry: dir.join("picu_subjects.csv"),
            processed_ledger: dir.join("done.txt"),
        }
    }

    fn subject(first: &str, location: &str) -> SubjectRecord {
        let mut record = SubjectRecord::new(Demographics {
            first_name: first.to_string(),
            ..Demographics::default()
        });
        record.add_location(location, "ZB04");
        record
    }

    #[test]
    fn test_persist_writes_both_views_and_ledger() {
        let dir = TempDir::new().unwrap();
        let paths = paths(dir.path());

        let mut registry = SubjectRegistry::new();
        registry.insert(subject("Jane", "ZB04"));
        registry.insert(subject("Joan", "ER1"));
        let ledger = ProcessedFileLedger::parse("/data/a.txt\n");

        persist_outputs(&paths, &registry, &ledger).unwrap();

        assert_eq!(load_registry(&paths.subject_registry).unwrap().len(), 2);
        let targets = load_registry(&paths.target_registry).unwrap();
        assert_eq!(targets.len(), 1);
        assert!(targets.iter().all(|r| r.demographics().first_name == "Jane"));
        assert_eq!(fs::read_to_string(&paths.processed_ledger).unwrap(), "/data/a.txt\n");
        for path in paths.all() {
            assert!(!OutputBatch::staging_path(path).exists());
        }
    }

    #[test]
    fn test_failed_persist_keeps_previous_ledger() {
        let dir = TempDir::new().unwrap();
        let mut paths = paths(dir.path());
        fs::write(&paths.processed_ledger, "/data/old.txt\n").unwrap();

        // Target registry destination is a non-empty directory
        paths.target_registry = dir.path().join("blocked");
        fs::create_dir(&paths.target_registry).unwrap();
        fs::write(paths.target_registry.join("keep"), "x").unwrap();

        let ledger = ProcessedFileLedger::parse("/data/old.txt\n/data/new.txt\n");
        let err = persist_outputs(&paths, &SubjectRegistry::new(), &ledger).unwrap_err();

        assert!(err.is_fatal());
        assert_eq!(
            fs::read_to_string(&paths.processed_ledger).unwrap(),
            "/data/old.txt\n"
        );
    }
}
