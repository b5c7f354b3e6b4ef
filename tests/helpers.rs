//! Shared test utilities for writer tests.

#![allow(dead_code)]

use fsimage::layout::{Size, SIZE_MIB};
use fsimage::mkfs::{self, MkfsFunc, RestoreHandlers};
use fsimage::{SharedStructure, Structure, VolumeContent};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Temporary layout: `<dir>/work` exists, `<dir>/content` does not.
pub struct TestEnv {
    /// Kept alive for the lifetime of the environment
    pub _temp_dir: TempDir,
    pub dir: PathBuf,
    pub work: PathBuf,
    pub content: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let dir = temp_dir.path().to_path_buf();
        let work = dir.join("work");
        fs::create_dir_all(&work).expect("Failed to create work dir");

        Self {
            content: dir.join("content"),
            work,
            dir,
            _temp_dir: temp_dir,
        }
    }

    /// Preallocate `<dir>/img` with the structure's declared size.
    pub fn img_for(&self, structure: &SharedStructure) -> PathBuf {
        let img = self.dir.join("img");
        make_sized_file(&img, structure.read().size.bytes());
        img
    }

    /// Entries currently present in the work directory.
    pub fn work_entries(&self) -> Vec<PathBuf> {
        let mut entries: Vec<PathBuf> = fs::read_dir(&self.work)
            .expect("Failed to list work dir")
            .map(|e| e.expect("Failed to read work dir entry").path())
            .collect();
        entries.sort();
        entries
    }
}

/// 2 MiB happyfs structure at index 1 without content.
pub fn trivial_structure() -> SharedStructure {
    structure("happyfs", 1, vec![])
}

pub fn structure(filesystem: &str, index: usize, content: Vec<VolumeContent>) -> SharedStructure {
    Structure {
        name: String::new(),
        label: String::new(),
        size: Size(2 * SIZE_MIB),
        filesystem: filesystem.to_string(),
        content,
        index,
    }
    .into_shared()
}

pub fn make_sized_file(path: &Path, size: u64) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    let file = fs::File::create(path).expect("Failed to create sized file");
    file.set_len(size).expect("Failed to size file");
}

/// Write `(relative path, content)` pairs below `root`.
pub fn make_content(root: &Path, files: &[(&str, &str)]) {
    for (name, content) in files {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create content dir");
        }
        fs::write(&path, content).expect("Failed to write content file");
    }
}

pub fn assert_content(root: &Path, files: &[(&str, &str)]) {
    for (name, content) in files {
        let path = root.join(name);
        assert_eq!(
            fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {}", path.display(), e)),
            *content,
            "unexpected content in {}",
            path.display()
        );
    }
}

/// Arguments of one builder invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MkfsCall {
    pub img: PathBuf,
    pub label: String,
    pub contents: PathBuf,
}

/// Builder that records every call and then returns `result`.
pub fn recording_mkfs(
    result: fn() -> anyhow::Result<()>,
) -> (MkfsFunc, Arc<Mutex<Vec<MkfsCall>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&calls);
    let func = mkfs::handler(move |img, label, contents| {
        recorded.lock().push(MkfsCall {
            img: img.to_path_buf(),
            label: label.to_string(),
            contents: contents.to_path_buf(),
        });
        result()
    });
    (func, calls)
}

/// Replace the registry with a single `happyfs` builder.
pub fn mock_happyfs(func: MkfsFunc) -> RestoreHandlers {
    mkfs::replace_all(HashMap::from([("happyfs".to_string(), func)]))
}
