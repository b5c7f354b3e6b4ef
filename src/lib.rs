//! Staged filesystem image writer for device image structures.
//!
//! Device images are assembled from a declarative layout. Each structure
//! (partition) that carries a filesystem gets its own image file, built here
//! and composed into the full device image elsewhere.
//!
//! - **Layout** - [`Structure`] descriptors: size, filesystem type, label, content
//! - **Builders** - [`mkfs`] registry of per-filesystem builders (`ext4`, `vfat`)
//! - **Staging** - exclusive per-structure staging directories, see [`staging`]
//! - **Content** - deploying declared content, see [`content`]
//! - **Writer** - [`FilesystemImageWriter`] ties the above together
//!
//! # Architecture
//!
//! ```text
//! FilesystemImageWriter::write(img)
//!     │
//!     ├── mkfs::lookup(filesystem)      builder resolved on every write
//!     ├── check image size              must match the declared size
//!     ├── StagingDir::create            <work>/stage-content-part-NNNN
//!     ├── ContentDeployer::deploy       declared content → staging dir
//!     ├── post-stage callback           optional
//!     ├── builder(img, label, staging)
//!     └── drop(StagingDir)              removed unless retention requested
//! ```

pub mod content;
pub mod error;
pub mod layout;
pub mod mkfs;
pub mod preflight;
pub mod process;
pub mod staging;
pub mod writer;

pub use content::{ContentDeployer, ContentError, DirectoryDeployer};
pub use error::{Error, InternalError};
pub use layout::{SharedStructure, Size, Structure, VolumeContent};
pub use staging::Retention;
pub use writer::{FilesystemImageWriter, PostStageFunc};
