//! Staged output files
//!
//! Every output is written next to its destination as `<name>.tmp` and only
//! renamed into place on commit, in staging order. Staged files left behind by
//! a failed or abandoned batch are removed on drop.

use crate::error::{LoaderError, LoaderResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

struct StagedFile {
    staged: PathBuf,
    target: PathBuf,
}

/// Set of outputs that are renamed into place together
#[derive(Default)]
pub struct OutputBatch {
    files: Vec<StagedFile>,
}

impl OutputBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Temporary path used while `target` is staged
    pub fn staging_path(target: &Path) -> PathBuf {
        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        target.with_file_name(format!("{}.tmp", file_name))
    }

    /// Write `contents` to the staging path of `target`
    pub fn stage(&mut self, target: &Path, contents: &[u8]) -> LoaderResult<()> {
        let staged = Self::staging_path(target);
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| persistence_error(target, e))?;
        }
        fs::write(&staged, contents).map_err(|e| persistence_error(&staged, e))?;
        debug!(path = %staged.display(), bytes = contents.len(), "Staged output");

        self.files.push(StagedFile {
            staged,
            target: target.to_path_buf(),
        });
        Ok(())
    }

    /// Number of staged files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Rename staged files into place, in staging order
    ///
    /// Stops at the first failed rename; files not yet renamed are discarded.
    pub fn commit(mut self) -> LoaderResult<()> {
        let files = std::mem::take(&mut self.files);
        let mut pending = files.into_iter();

        while let Some(file) = pending.next() {
            if let Err(e) = fs::rename(&file.staged, &file.target) {
                self.files = std::iter::once(file).chain(pending).collect();
                let target = &self.files[0].target;
                return Err(persistence_error(target, e));
            }
            debug!(path = %file.target.display(), "Committed output");
        }
        Ok(())
    }
}

impl Drop for OutputBatch {
    fn drop(&mut self) {
        for file in self.files.drain(..) {
            if let Err(e) = fs::remove_file(&file.staged) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %file.staged.display(), error = %e, "Failed to remove staged output");
                }
            }
        }
    }
}

fn persistence_error(path: &Path, error: std::io::Error) -> LoaderError {
    LoaderError::Persistence {
        path: path.to_path_buf(),
        reason: error.to_string(),
    }
}
