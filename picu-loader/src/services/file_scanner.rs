//! Message file scanner and reconciliation
//!
//! Walks the root directory for message containers and diffs the result
//! against the processed-file ledger. Paths are canonical (absolute,
//! symlink-resolved) and come back in directory-listing order.

use crate::store::ProcessedFileLedger;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Extensions of plain-text message containers
pub const MESSAGE_EXTENSIONS: [&str; 2] = ["txt", "msg"];

/// File scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Message file scanner
pub struct FileScanner {
    extensions: Vec<String>,
    excluded: HashSet<PathBuf>,
}

impl FileScanner {
    /// Scanner accepting `.txt` and `.msg` files
    pub fn new() -> Self {
        Self {
            extensions: MESSAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            excluded: HashSet::new(),
        }
    }

    /// Never report these files (the loader's own outputs)
    ///
    /// Paths that do not exist yet are kept as given; they are compared
    /// after canonicalization of the scanned files.
    pub fn with_excluded<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for path in paths {
            let path = path.as_ref();
            let resolved = canonical_or_absolute(path);
            self.excluded.insert(resolved);
        }
        self
    }

    /// All candidate message files under `root_path`
    pub fn scan(&self, root_path: &Path) -> Result<Vec<PathBuf>, ScanError> {
        if !root_path.exists() {
            return Err(ScanError::PathNotFound(root_path.to_path_buf()));
        }

        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory(root_path.to_path_buf()));
        }

        let mut seen = HashSet::new();
        let files: Vec<PathBuf> = WalkDir::new(root_path)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    // Continue scanning, don't abort
                    tracing::warn!("Error accessing entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && self.has_message_extension(entry))
            .filter_map(|entry| match entry.path().canonicalize() {
                Ok(canonical) => Some(canonical),
                Err(e) => {
                    tracing::warn!("Cannot resolve {}: {}", entry.path().display(), e);
                    None
                }
            })
            .filter(|path| !self.excluded.contains(path))
            .filter(|path| seen.insert(path.clone()))
            .collect();

        tracing::debug!(
            root = %root_path.display(),
            candidates = files.len(),
            "Message file scan complete"
        );

        Ok(files)
    }

    /// Candidate files not yet present in the ledger
    ///
    /// Idempotent: an unchanged directory and ledger give the same answer,
    /// and once the result is added to the ledger the next call is empty.
    pub fn reconcile(
        &self,
        root_path: &Path,
        ledger: &ProcessedFileLedger,
    ) -> Result<Vec<PathBuf>, ScanError> {
        let candidates = self.scan(root_path)?;
        let total = candidates.len();

        let new_files: Vec<PathBuf> = candidates
            .into_iter()
            .filter(|path| !ledger.contains(path))
            .collect();

        tracing::debug!(
            candidates = total,
            new_files = new_files.len(),
            "Reconciled against ledger"
        );

        Ok(new_files)
    }

    fn has_message_extension(&self, entry: &DirEntry) -> bool {
        entry
            .path()
            .extension()
            .map(|ext| {
                let ext = ext.to_string_lossy();
                self.extensions.iter().any(|accepted| accepted.as_str() == ext)
            })
            .unwrap_or(false)
    }
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical form of an existing path; absolute form of a missing one
fn canonical_or_absolute(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    // Missing file: resolve its parent so it still matches scanned paths
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => parent
            .canonicalize()
            .map(|p| p.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_nonexistent_path() {
        let scanner = FileScanner::new();
        let result = scanner.scan(Path::new("/nonexistent/picu/path"));
        match result.unwrap_err() {
            ScanError::PathNotFound(_) => {}
            other => panic!("Expected PathNotFound error, got {:?}", other),
        }
    }

    #[test]
    fn test_scan_file_as_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "MSH|^~\\&|").unwrap();

        let scanner = FileScanner::new();
        match scanner.scan(&file).unwrap_err() {
            ScanError::NotADirectory(_) => {}
            other => panic!("Expected NotADirectory error, got {:?}", other),
        }
    }

    #[test]
    fn test_scan_empty_directory() {
        let dir = TempDir::new().unwrap();
        let scanner = FileScanner::new();
        assert!(scanner.scan(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_scan_filters_extensions_and_recurses() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("2015/03")).unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();
        fs::write(dir.path().join("2015/03/b.msg"), "").unwrap();
        fs::write(dir.path().join("2015/c.xlsx"), "").unwrap();
        fs::write(dir.path().join("notes.TXT.bak"), "").unwrap();

        let scanner = FileScanner::new();
        let mut files = scanner.scan(dir.path()).unwrap();
        files.sort();

        let root = dir.path().canonicalize().unwrap();
        assert_eq!(
            files,
            vec![root.join("2015/03/b.msg"), root.join("a.txt")]
        );
    }

    #[test]
    fn test_excluded_outputs_are_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();
        fs::write(dir.path().join("done.txt"), "").unwrap();

        let scanner = FileScanner::new().with_excluded([dir.path().join("done.txt")]);
        let files = scanner.scan(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("a.txt"));
    }

    #[test]
    fn test_excluded_missing_file_still_matches() {
        let dir = TempDir::new().unwrap();
        let scanner = FileScanner::new().with_excluded([dir.path().join("done.txt")]);
        fs::write(dir.path().join("done.txt"), "").unwrap();
        assert!(scanner.scan(dir.path()).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_resolved_to_canonical_path() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");
        let inbox = dir.path().join("inbox");
        fs::create_dir_all(&data).unwrap();
        fs::create_dir_all(&inbox).unwrap();
        fs::write(data.join("a.txt"), "").unwrap();
        std::os::unix::fs::symlink(data.join("a.txt"), inbox.join("link.txt")).unwrap();

        let scanner = FileScanner::new();
        let files = scanner.scan(&inbox).unwrap();
        assert_eq!(files, vec![data.join("a.txt").canonicalize().unwrap()]);
    }

    #[test]
    fn test_reconcile_skips_ledger_entries() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();
        fs::write(dir.path().join("b.txt"), "").unwrap();

        let scanner = FileScanner::new();
        let mut ledger = ProcessedFileLedger::default();
        ledger.extend([dir.path().join("a.txt").canonicalize().unwrap()]);

        let new_files = scanner.reconcile(dir.path(), &ledger).unwrap();
        assert_eq!(new_files.len(), 1);
        assert!(new_files[0].ends_with("b.txt"));

        ledger.extend(new_files);
        assert!(scanner.reconcile(dir.path(), &ledger).unwrap().is_empty());
    }
}
