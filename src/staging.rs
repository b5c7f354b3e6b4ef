//! Per-structure staging directories.
//!
//! A staging directory holds a structure's content between deployment and
//! filesystem creation. It is created exclusively, so leftovers from an
//! earlier run are reported instead of silently reused, and it is removed
//! when the [`StagingDir`] is dropped unless retention is requested.

use crate::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Prefix of staging directory names below the work directory.
pub const STAGING_DIR_PREFIX: &str = "stage-content";

/// Environment variable that keeps staging directories around for inspection.
pub const NO_CLEANUP_ENV: &str = "FSIMAGE_DEBUG_NO_CLEANUP";

/// Name of the staging directory for the structure at 1-based `index`.
pub fn staging_dir_name(index: usize) -> String {
    format!("{STAGING_DIR_PREFIX}-part-{index:04}")
}

/// What happens to a staging directory once the write is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Retention {
    /// Consult [`NO_CLEANUP_ENV`] at cleanup time.
    #[default]
    FromEnv,
    Keep,
    Remove,
}

impl Retention {
    /// Resolve to whether the directory should be kept.
    pub fn keep(self) -> bool {
        match self {
            Retention::FromEnv => std::env::var(NO_CLEANUP_ENV)
                .map(|value| is_truthy(&value))
                .unwrap_or(false),
            Retention::Keep => true,
            Retention::Remove => false,
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value, "1" | "t" | "T" | "true" | "TRUE" | "True")
}

/// An exclusively created staging directory, removed on drop.
#[derive(Debug)]
pub struct StagingDir {
    path: PathBuf,
    retention: Retention,
}

impl StagingDir {
    /// Create `work_dir/<prefix>-part-NNNN`.
    ///
    /// The work directory itself must exist; it is never created here.
    pub fn create(work_dir: &Path, index: usize, retention: Retention) -> Result<Self, Error> {
        let path = work_dir.join(staging_dir_name(index));
        match fs::create_dir(&path) {
            Ok(()) => {
                tracing::debug!("Created staging directory: {}", path.display());
                Ok(Self { path, retention })
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(Error::StagingExists { path })
            }
            Err(source) => Err(Error::CreateStaging { path, source }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if self.retention.keep() {
            tracing::debug!("Keeping staging directory: {}", self.path.display());
            return;
        }

        if let Err(e) = fs::remove_dir_all(&self.path) {
            tracing::warn!(
                "Failed to cleanup staging directory {}: {}",
                self.path.display(),
                e
            );
        } else {
            tracing::debug!("Cleaned up staging directory: {}", self.path.display());
        }
    }
}
