//! Deploying declared structure content into a staging directory.
//!
//! The writer does not care how content gets copied; it only needs to know
//! which declared entry failed. [`ContentDeployer`] is the seam for that, and
//! [`DirectoryDeployer`] is the plain directory copy used by default.

use crate::layout::VolumeContent;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Failure to deploy one declared content entry.
#[derive(Debug, Error)]
#[error("cannot write filesystem content of source:{entry}: {cause:#}")]
pub struct ContentError {
    /// The `source` of the failing entry, as declared.
    pub entry: String,
    #[source]
    pub cause: anyhow::Error,
}

impl ContentError {
    pub fn new(entry: impl Into<String>, cause: anyhow::Error) -> Self {
        Self {
            entry: entry.into(),
            cause,
        }
    }
}

/// Populates a directory tree from declared source/target mappings.
pub trait ContentDeployer {
    /// Deploy `entries` in order from `content_root` into `target_root`.
    fn deploy(
        &self,
        content_root: &Path,
        entries: &[VolumeContent],
        target_root: &Path,
    ) -> Result<(), ContentError>;
}

/// Copies content from a directory on the host.
///
/// Rules per entry:
/// - `source/` (trailing slash): the children of the directory land in `target`
/// - `source` directory: the directory itself lands in `target/<basename>`
/// - `source` file: lands in `target/<basename>` if `target` ends with `/`,
///   otherwise it is written as `target`
///
/// Symlinks are copied as symlinks.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectoryDeployer;

impl ContentDeployer for DirectoryDeployer {
    fn deploy(
        &self,
        content_root: &Path,
        entries: &[VolumeContent],
        target_root: &Path,
    ) -> Result<(), ContentError> {
        for entry in entries {
            deploy_entry(content_root, entry, target_root)
                .map_err(|cause| ContentError::new(entry.source.as_str(), cause))?;
        }
        Ok(())
    }
}

fn deploy_entry(content_root: &Path, entry: &VolumeContent, target_root: &Path) -> Result<()> {
    if entry.source.is_empty() {
        bail!("internal error: source cannot be unset");
    }
    if entry.target.is_empty() {
        bail!("internal error: target cannot be unset");
    }

    let src = join_under(content_root, &entry.source);
    let dst = join_under(target_root, &entry.target);

    let meta = fs::symlink_metadata(&src)
        .with_context(|| format!("cannot stat {}", src.display()))?;

    if meta.is_dir() {
        if entry.source.ends_with('/') {
            copy_tree(&src, &dst)
        } else {
            copy_tree(&src, &dst.join(basename(&src)?))
        }
    } else {
        let dst = if entry.target.ends_with('/') {
            dst.join(basename(&src)?)
        } else {
            dst
        };
        copy_entry(&src, &dst, meta.file_type().is_symlink())
    }
}

/// Join a declared (possibly absolute-looking) path below `root`.
fn join_under(root: &Path, declared: &str) -> PathBuf {
    let relative = declared.trim_start_matches('/');
    if relative.is_empty() {
        root.to_path_buf()
    } else {
        root.join(relative)
    }
}

fn basename(path: &Path) -> Result<&std::ffi::OsStr> {
    path.file_name()
        .ok_or_else(|| anyhow::anyhow!("cannot determine name of {}", path.display()))
}

fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.with_context(|| format!("cannot walk {}", src.display()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .with_context(|| format!("unexpected path {}", entry.path().display()))?;
        let target = if relative.as_os_str().is_empty() {
            dst.to_path_buf()
        } else {
            dst.join(relative)
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("cannot create directory {}", target.display()))?;
        } else {
            copy_entry(entry.path(), &target, file_type.is_symlink())?;
        }
    }
    Ok(())
}

fn copy_entry(src: &Path, dst: &Path, is_symlink: bool) -> Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("cannot create directory {}", parent.display()))?;
    }

    if is_symlink {
        let link_target = fs::read_link(src)
            .with_context(|| format!("cannot read symlink {}", src.display()))?;
        if dst.is_symlink() || dst.exists() {
            fs::remove_file(dst)
                .with_context(|| format!("cannot replace {}", dst.display()))?;
        }
        std::os::unix::fs::symlink(&link_target, dst)
            .with_context(|| format!("cannot create symlink {}", dst.display()))?;
    } else {
        fs::copy(src, dst)
            .with_context(|| format!("cannot copy {} to {}", src.display(), dst.display()))?;
    }
    Ok(())
}
