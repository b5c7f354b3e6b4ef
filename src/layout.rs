//! Structure descriptors consumed by the image writer.
//!
//! A [`Structure`] describes one partition of a volume: its declared size,
//! filesystem type, optional label and the content that has to be deployed
//! into the filesystem before it is finalized. Writers keep a
//! [`SharedStructure`] handle rather than a copy, so changes made by the
//! owner after construction are observed on the next write.

use anyhow::{bail, Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

pub const SIZE_KIB: u64 = 1024;
pub const SIZE_MIB: u64 = 1024 * SIZE_KIB;
pub const SIZE_GIB: u64 = 1024 * SIZE_MIB;

/// Filesystem type marking a structure without a filesystem.
pub const NO_FILESYSTEM: &str = "none";

/// Caller-owned handle to a structure descriptor.
pub type SharedStructure = Arc<RwLock<Structure>>;

/// Size of a structure in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Size(pub u64);

impl Size {
    pub fn bytes(self) -> u64 {
        self.0
    }
}

impl From<u64> for Size {
    fn from(bytes: u64) -> Self {
        Size(bytes)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for Size {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SizeVisitor;

        impl serde::de::Visitor<'_> for SizeVisitor {
            type Value = Size;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a byte count or a size string like '512K', '2M' or '1G'")
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Size(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u64::try_from(value)
                    .map(Size)
                    .map_err(|_| E::custom(format!("size cannot be negative: {value}")))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                parse_size(value).map(Size).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(SizeVisitor)
    }
}

/// Parse a size with an optional binary K/M/G suffix.
pub fn parse_size(size: &str) -> Result<u64> {
    let lower = size.trim().to_ascii_lowercase();
    let (digits, multiplier) = if let Some(num) = lower.strip_suffix('k') {
        (num, SIZE_KIB)
    } else if let Some(num) = lower.strip_suffix('m') {
        (num, SIZE_MIB)
    } else if let Some(num) = lower.strip_suffix('g') {
        (num, SIZE_GIB)
    } else {
        (lower.as_str(), 1)
    };

    let value = digits
        .trim()
        .parse::<u64>()
        .with_context(|| format!("invalid size '{size}'"))?;
    match value.checked_mul(multiplier) {
        Some(bytes) => Ok(bytes),
        None => bail!("size '{size}' overflows"),
    }
}

/// One source to target mapping deployed into a structure's filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VolumeContent {
    /// Path relative to the content directory. A trailing `/` selects the
    /// directory's children rather than the directory itself.
    pub source: String,
    /// Path relative to the root of the filesystem.
    pub target: String,
}

impl VolumeContent {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// A structure positioned within its volume.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Structure {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub label: String,
    pub size: Size,
    #[serde(default)]
    pub filesystem: String,
    #[serde(default)]
    pub content: Vec<VolumeContent>,
    /// 1-based position of the structure within the volume.
    pub index: usize,
}

impl Structure {
    pub fn has_filesystem(&self) -> bool {
        !self.filesystem.is_empty() && self.filesystem != NO_FILESYSTEM
    }

    pub fn into_shared(self) -> SharedStructure {
        Arc::new(RwLock::new(self))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StructureToml {
    structure: Structure,
}

/// Load a single structure descriptor from a TOML file.
pub fn load_structure(path: &Path) -> Result<Structure> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading structure descriptor '{}'", path.display()))?;
    parse_structure(&raw)
        .with_context(|| format!("parsing structure descriptor '{}'", path.display()))
}

fn parse_structure(raw: &str) -> Result<Structure> {
    let parsed: StructureToml = toml::from_str(raw)?;
    let structure = parsed.structure;
    if structure.index == 0 {
        bail!("structure index is 1-based, got 0");
    }
    Ok(structure)
}
