//! Error types for filesystem image writing.
//!
//! Errors fall in two classes:
//! - [`InternalError`]: the caller wired the writer up incorrectly (unset
//!   content directory, missing structure, no filesystem, unknown filesystem
//!   type). These are programming mistakes, retrying will not help.
//! - Everything else on [`Error`]: runtime faults of a specific write stage.
//!   Each variant keeps the underlying cause.

use crate::content::ContentError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by [`crate::FilesystemImageWriter`].
#[derive(Debug, Error)]
pub enum Error {
    /// Integration mistake in the calling code.
    #[error("internal error: {0}")]
    Internal(#[from] InternalError),

    #[error("cannot stat image file: {}: {source}", .path.display())]
    StatImage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("size of image file {actual} is different from declared structure size {declared}")]
    ImageSize { actual: u64, declared: u64 },

    /// Staging directory could not be created, usually a missing work directory.
    #[error("cannot prepare staging directory: mkdir {}: {source}", .path.display())]
    CreateStaging {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A staging directory from an earlier run is still around.
    #[error("cannot prepare staging directory {}: path exists", .path.display())]
    StagingExists { path: PathBuf },

    #[error("cannot prepare filesystem content: {0}")]
    Content(#[source] ContentError),

    #[error("post stage callback failed: {0:#}")]
    PostStage(#[source] anyhow::Error),

    #[error("cannot create \"{filesystem}\" filesystem: {source:#}")]
    Mkfs {
        filesystem: String,
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    /// True for errors caused by the caller rather than the environment.
    pub fn is_internal(&self) -> bool {
        matches!(self, Error::Internal(_))
    }
}

/// Caller or integration mistakes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    #[error("content directory cannot be unset")]
    ContentDirUnset,

    #[error("structure is unset")]
    StructureUnset,

    #[error("structure has no filesystem")]
    NoFilesystem,

    #[error("filesystem \"{0}\" has no handler")]
    NoHandler(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_errors_are_prefixed() {
        let err = Error::from(InternalError::NoHandler("xfs".into()));
        assert_eq!(err.to_string(), r#"internal error: filesystem "xfs" has no handler"#);
        assert!(err.is_internal());
    }

    #[test]
    fn test_operational_errors_keep_cause() {
        let err = Error::Mkfs {
            filesystem: "happyfs".into(),
            source: anyhow::anyhow!("inner").context("outer"),
        };
        assert_eq!(err.to_string(), r#"cannot create "happyfs" filesystem: outer: inner"#);
        assert!(!err.is_internal());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_size_mismatch_names_both_sizes() {
        let err = Error::ImageSize {
            actual: 1024,
            declared: 2048,
        };
        assert_eq!(
            err.to_string(),
            "size of image file 1024 is different from declared structure size 2048"
        );
    }
}
