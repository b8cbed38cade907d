//! Processed-file ledger: one canonical path per line, UTF-8

use crate::error::{LoaderError, LoaderResult};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

/// Files ingested by earlier runs plus this one, in insertion order
#[derive(Debug, Clone, Default)]
pub struct ProcessedFileLedger {
    entries: Vec<PathBuf>,
    index: HashSet<PathBuf>,
}

impl ProcessedFileLedger {
    /// Load the ledger; a missing file is an empty ledger
    pub fn load(path: &Path) -> LoaderResult<Self> {
        if !path.exists() {
            info!(path = %path.display(), "No processed-file ledger yet, starting empty");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path).map_err(|e| {
            LoaderError::config(
                "processed_ledger",
                format!("cannot read {}: {}", path.display(), e),
            )
        })?;
        Ok(Self::parse(&text))
    }

    /// Parse ledger text; blank lines are ignored
    pub fn parse(text: &str) -> Self {
        let mut ledger = Self::default();
        ledger.extend(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(PathBuf::from),
        );
        ledger
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.index.contains(path)
    }

    /// Add a path; returns false if it was already recorded
    pub fn insert(&mut self, path: PathBuf) -> bool {
        if self.index.contains(&path) {
            return false;
        }
        self.index.insert(path.clone());
        self.entries.push(path);
        true
    }

    pub fn extend<I>(&mut self, paths: I)
    where
        I: IntoIterator<Item = PathBuf>,
    {
        for path in paths {
            self.insert(path);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(PathBuf::as_path)
    }

    /// Complete ledger text, newline terminated
    pub fn render(&self) -> String {
        let mut out = String::new();
        for path in &self.entries {
            out.push_str(&path.to_string_lossy());
            out.push('\n');
        }
        out
    }
}
