//! Filesystem image writer.
//!
//! Builds the filesystem of a single structure into a preallocated image
//! file. A write runs these steps and stops at the first failure:
//!
//! 1. resolve the builder for the structure's filesystem type
//! 2. check the image file exists and has exactly the declared size
//! 3. create the structure's staging directory below the work directory
//! 4. deploy the declared content into the staging directory
//! 5. run the optional post-stage callback on the staged tree
//! 6. run the builder on the image with the staged tree
//!
//! The staging directory is removed on the way out, whether the write
//! succeeded or not, unless retention is requested.
//!
//! # Example
//!
//! ```rust,ignore
//! use fsimage::{FilesystemImageWriter, Structure};
//!
//! let structure = fsimage::layout::load_structure(Path::new("boot.toml"))?.into_shared();
//! let writer = FilesystemImageWriter::new("gadget", Some(structure), "work")?;
//! writer.write(Path::new("boot.img"), None)?;
//! ```

use crate::content::{ContentDeployer, DirectoryDeployer};
use crate::error::{Error, InternalError};
use crate::layout::{SharedStructure, Structure};
use crate::mkfs::{self, MkfsFunc};
use crate::staging::{Retention, StagingDir};
use std::fs;
use std::path::{Path, PathBuf};

/// Hook run on the staged tree before the filesystem is built.
pub type PostStageFunc<'a> = &'a mut dyn FnMut(&Path, &Structure) -> anyhow::Result<()>;

/// Writes the filesystem of one structure into an image file.
pub struct FilesystemImageWriter {
    content_dir: PathBuf,
    structure: SharedStructure,
    work_dir: PathBuf,
    deployer: Box<dyn ContentDeployer + Send + Sync>,
    retention: Retention,
}

impl FilesystemImageWriter {
    /// Create a writer for `structure`, with content taken from `content_dir`
    /// and staged below `work_dir`.
    ///
    /// The structure handle is kept as is, so later changes to it are seen by
    /// [`write`](Self::write).
    pub fn new(
        content_dir: impl AsRef<Path>,
        structure: Option<SharedStructure>,
        work_dir: impl AsRef<Path>,
    ) -> Result<Self, Error> {
        let content_dir = content_dir.as_ref();
        if content_dir.as_os_str().is_empty() {
            return Err(InternalError::ContentDirUnset.into());
        }
        let structure = structure.ok_or(InternalError::StructureUnset)?;

        {
            let ps = structure.read();
            if !ps.has_filesystem() {
                return Err(InternalError::NoFilesystem.into());
            }
            resolve_handler(&ps.filesystem)?;
        }

        Ok(Self {
            content_dir: content_dir.to_path_buf(),
            structure,
            work_dir: work_dir.as_ref().to_path_buf(),
            deployer: Box::new(DirectoryDeployer),
            retention: Retention::default(),
        })
    }

    /// Use `deployer` to populate the staging directory.
    pub fn with_deployer(mut self, deployer: impl ContentDeployer + Send + Sync + 'static) -> Self {
        self.deployer = Box::new(deployer);
        self
    }

    pub fn with_retention(mut self, retention: Retention) -> Self {
        self.retention = retention;
        self
    }

    /// The structure this writer builds.
    pub fn structure(&self) -> &SharedStructure {
        &self.structure
    }

    /// Build the structure's filesystem into the image at `img`.
    ///
    /// `img` must already exist with the declared structure size. The
    /// structure is read once when the write starts; changes made while it
    /// runs, including from the post-stage callback, apply to the next write.
    pub fn write(&self, img: &Path, post_stage: Option<PostStageFunc<'_>>) -> Result<(), Error> {
        // snapshot per call, the lock is not held while collaborators run
        let ps: Structure = self.structure.read().clone();

        // the filesystem type may have changed since construction
        let mkfs = resolve_handler(&ps.filesystem)?;

        check_image(img, ps.size.bytes())?;

        let staging = StagingDir::create(&self.work_dir, ps.index, self.retention)?;
        let staging_dir = staging.path();

        tracing::debug!(
            "Staging {} content entries for structure #{} in {}",
            ps.content.len(),
            ps.index,
            staging_dir.display()
        );
        self.deployer
            .deploy(&self.content_dir, &ps.content, staging_dir)
            .map_err(Error::Content)?;

        if let Some(post_stage) = post_stage {
            post_stage(staging_dir, &ps).map_err(Error::PostStage)?;
        }

        tracing::debug!(
            "Creating {} filesystem in {} (label {:?})",
            ps.filesystem,
            img.display(),
            ps.label
        );
        mkfs(img, ps.label.as_str(), staging_dir).map_err(|source| Error::Mkfs {
            filesystem: ps.filesystem.clone(),
            source,
        })?;

        Ok(())
    }
}

fn resolve_handler(filesystem: &str) -> Result<MkfsFunc, Error> {
    mkfs::lookup(filesystem)
        .ok_or_else(|| InternalError::NoHandler(filesystem.to_string()).into())
}

fn check_image(img: &Path, declared: u64) -> Result<(), Error> {
    let meta = fs::metadata(img).map_err(|source| Error::StatImage {
        path: img.to_path_buf(),
        source,
    })?;
    if meta.len() != declared {
        return Err(Error::ImageSize {
            actual: meta.len(),
            declared,
        });
    }
    Ok(())
}
