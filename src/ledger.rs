/*!
 * Temporary resource tracking.
 *
 * Every temporary artifact created during one generation attempt (synthesized
 * audio, caption assets, intermediate files) lives inside a per-attempt
 * workspace directory and is registered here on creation. Releasing is
 * best-effort and idempotent, and `Drop` releases anything still tracked.
 */

use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::errors::LedgerError;

/// Outcome of a release pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReleaseReport {
    /// Resources removed from disk
    pub removed: usize,
    /// Resources that were already gone
    pub missing: usize,
    /// Resources that could not be removed
    pub failed: usize,
}

/// Tracks every temporary artifact of one attempt
#[derive(Debug)]
pub struct ResourceLedger {
    workspace: PathBuf,
    tracked: Vec<PathBuf>,
    released: bool,
}

impl ResourceLedger {
    /// Create a ledger with a fresh `textreel-<uuid>` workspace under `base_dir`
    pub fn new(base_dir: &Path) -> Result<Self, LedgerError> {
        let workspace = base_dir.join(format!("textreel-{}", Uuid::new_v4()));
        fs::create_dir_all(&workspace).map_err(|source| LedgerError::Workspace {
            path: workspace.clone(),
            source,
        })?;
        debug!("Created workspace {:?}", workspace);

        Ok(Self {
            workspace,
            tracked: Vec::new(),
            released: false,
        })
    }

    /// Directory holding this attempt's artifacts
    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Register an artifact for release
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.tracked.contains(&path) {
            self.tracked.push(path);
        }
        self.released = false;
    }

    /// Reserve and register a unique path inside the workspace
    pub fn temp_path(&mut self, stem: &str, extension: &str) -> PathBuf {
        let path = self
            .workspace
            .join(format!("{}_{}.{}", stem, Uuid::new_v4().simple(), extension));
        self.track(path.clone());
        path
    }

    /// Write `contents` to a new tracked file inside the workspace.
    ///
    /// The path is registered before the write, so a partial file is still
    /// released.
    pub fn write_temp(&mut self, stem: &str, extension: &str, contents: &[u8]) -> Result<PathBuf, LedgerError> {
        let path = self.temp_path(stem, extension);
        fs::write(&path, contents).map_err(|source| LedgerError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Paths currently tracked
    pub fn tracked(&self) -> &[PathBuf] {
        &self.tracked
    }

    /// Whether every tracked resource has been released
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Release every tracked resource, then the workspace.
    ///
    /// A failure to remove one resource is logged and does not stop the rest.
    /// Calling this again after a full release does nothing.
    pub fn release_all(&mut self) -> ReleaseReport {
        let mut report = ReleaseReport::default();
        if self.released {
            return report;
        }

        let mut retained = Vec::new();
        for path in self.tracked.drain(..) {
            match remove_path(&path) {
                Ok(true) => report.removed += 1,
                Ok(false) => report.missing += 1,
                Err(e) => {
                    warn!("Failed to release temporary resource {:?}: {}", path, e);
                    report.failed += 1;
                    retained.push(path);
                }
            }
        }

        match remove_path(&self.workspace) {
            Ok(_) => {}
            Err(e) => {
                warn!("Failed to remove workspace {:?}: {}", self.workspace, e);
                report.failed += 1;
            }
        }

        debug!(
            "Released workspace {:?}: {} removed, {} missing, {} failed",
            self.workspace, report.removed, report.missing, report.failed
        );

        self.tracked = retained;
        self.released = true;
        report
    }
}

impl Drop for ResourceLedger {
    fn drop(&mut self) {
        if !self.is_released() {
            self.release_all();
        }
    }
}

/// Remove a file or directory; `Ok(false)` if it did not exist
fn remove_path(path: &Path) -> std::io::Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path).map(|_| true),
        Ok(_) => fs::remove_file(path).map(|_| true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
