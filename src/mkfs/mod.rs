//! Filesystem builder registry.
//!
//! Builders are looked up by filesystem type name. Each builder receives a
//! preallocated image file, a volume label (possibly empty) and the root of
//! the staged content, and turns the image into a populated filesystem.
//!
//! The registry is process-wide and seeded with the built-in builders:
//! - [`ext4`] - `mkfs.ext4 -d`, populated straight from the staging directory
//! - [`vfat`] - `mkfs.vfat`, then populated with `mcopy`
//!
//! Tests swap the whole table with [`replace_all`] and get the previous one
//! back through the returned [`RestoreHandlers`] guard.
//!
//! # Example
//!
//! ```rust,ignore
//! use fsimage::mkfs;
//! use std::collections::HashMap;
//!
//! let restore = mkfs::replace_all(HashMap::from([(
//!     "happyfs".to_string(),
//!     mkfs::handler(|_img, _label, _contents| Ok(())),
//! )]));
//! // ... exercise a writer ...
//! restore.restore();
//! ```

pub mod ext4;
pub mod vfat;

use anyhow::Result;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, LazyLock};

/// Builds a filesystem of one type: `(image, label, contents_root)`.
pub type MkfsFunc = Arc<dyn Fn(&Path, &str, &Path) -> Result<()> + Send + Sync>;

static HANDLERS: LazyLock<RwLock<HashMap<String, MkfsFunc>>> =
    LazyLock::new(|| RwLock::new(builtin_handlers()));

fn builtin_handlers() -> HashMap<String, MkfsFunc> {
    HashMap::from([
        ("ext4".to_string(), handler(ext4::mkfs_ext4)),
        ("vfat".to_string(), handler(vfat::mkfs_vfat)),
    ])
}

/// Wrap a function or closure as a [`MkfsFunc`].
pub fn handler<F>(f: F) -> MkfsFunc
where
    F: Fn(&Path, &str, &Path) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Register (or replace) the builder for `name`.
pub fn register(name: impl Into<String>, f: MkfsFunc) {
    HANDLERS.write().insert(name.into(), f);
}

/// Builder registered for `name`, if any.
pub fn lookup(name: &str) -> Option<MkfsFunc> {
    HANDLERS.read().get(name).cloned()
}

/// Registered filesystem type names, sorted.
pub fn registered() -> Vec<String> {
    let mut names: Vec<String> = HANDLERS.read().keys().cloned().collect();
    names.sort();
    names
}

/// Replace the whole registry until the returned guard restores it.
pub fn replace_all(handlers: HashMap<String, MkfsFunc>) -> RestoreHandlers {
    let previous = std::mem::replace(&mut *HANDLERS.write(), handlers);
    RestoreHandlers {
        previous: Some(previous),
    }
}

/// Puts back the registry that [`replace_all`] swapped out.
///
/// Restoring happens once: either through [`RestoreHandlers::restore`] or
/// when the guard is dropped.
#[must_use = "the previous handlers are restored as soon as the guard is dropped"]
pub struct RestoreHandlers {
    previous: Option<HashMap<String, MkfsFunc>>,
}

impl RestoreHandlers {
    pub fn restore(mut self) {
        self.reinstate();
    }

    fn reinstate(&mut self) {
        if let Some(previous) = self.previous.take() {
            *HANDLERS.write() = previous;
        }
    }
}

impl Drop for RestoreHandlers {
    fn drop(&mut self) {
        self.reinstate();
    }
}

pub(crate) fn running_as_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}
