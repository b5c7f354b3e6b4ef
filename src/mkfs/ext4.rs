//! ext4 builder backed by `mkfs.ext4 -d`.

use crate::process::Cmd;
use anyhow::Result;
use std::path::Path;

/// Create an ext4 filesystem in `img`, populated from `contents`.
///
/// `mkfs.ext4` copies the directory itself, no mounting involved. Without
/// root the tool runs under `fakeroot` so that staged files end up owned by
/// root inside the image.
pub fn mkfs_ext4(img: &Path, label: &str, contents: &Path) -> Result<()> {
    ext4_command(img, label, contents, super::running_as_root()).run()?;
    Ok(())
}

fn ext4_command(img: &Path, label: &str, contents: &Path, as_root: bool) -> Cmd {
    let mut mkfs = vec!["-T".to_string(), "default".to_string()];
    if !contents.as_os_str().is_empty() {
        mkfs.push("-d".to_string());
        mkfs.push(contents.to_string_lossy().into_owned());
    }
    if !label.is_empty() {
        mkfs.push("-L".to_string());
        mkfs.push(label.to_string());
    }

    let cmd = if as_root {
        Cmd::new("mkfs.ext4").args(mkfs)
    } else {
        Cmd::new("fakeroot").args(["--", "mkfs.ext4"]).args(mkfs)
    };
    cmd.arg_path(img).error_msg("mkfs.ext4 failed")
}
