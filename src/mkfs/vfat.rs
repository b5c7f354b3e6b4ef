//! vfat builder backed by `mkfs.vfat` and mtools.
//!
//! `mkfs.vfat` cannot populate the filesystem, so the staged content is
//! copied in afterwards with `mcopy` without mounting the image.

use crate::process::Cmd;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Create a FAT32 filesystem in `img` and copy `contents` into its root.
pub fn mkfs_vfat(img: &Path, label: &str, contents: &Path) -> Result<()> {
    format_command(img, label).run()?;

    if contents.as_os_str().is_empty() {
        return Ok(());
    }

    let entries = top_level_entries(contents)?;
    if entries.is_empty() {
        return Ok(());
    }
    mcopy_command(img, &entries).run()?;
    Ok(())
}

fn format_command(img: &Path, label: &str) -> Cmd {
    // 512B logical sectors, 1 sector per cluster, FAT32
    let mut cmd = Cmd::new("mkfs.vfat").args(["-S", "512", "-s", "1", "-F", "32"]);
    if !label.is_empty() {
        cmd = cmd.args(["-n", label]);
    }
    cmd.arg_path(img).error_msg("mkfs.vfat failed")
}

fn mcopy_command(img: &Path, entries: &[PathBuf]) -> Cmd {
    let mut cmd = Cmd::new("mcopy").args(["-s", "-i"]).arg_path(img);
    for entry in entries {
        cmd = cmd.arg_path(entry);
    }
    cmd.arg("::").error_msg("cannot populate vfat filesystem")
}

fn top_level_entries(contents: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(contents)
        .with_context(|| format!("cannot list {}", contents.display()))?
    {
        entries.push(entry?.path());
    }
    entries.sort();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::SIZE_MIB;
    use std::io::{Read, Seek, SeekFrom};
    use tempfile::TempDir;

    #[test]
    fn test_format_command() {
        assert_eq!(
            format_command(Path::new("/img"), "system-boot").command_line(),
            "mkfs.vfat -S 512 -s 1 -F 32 -n system-boot /img"
        );
        assert_eq!(
            format_command(Path::new("/img"), "").command_line(),
            "mkfs.vfat -S 512 -s 1 -F 32 /img"
        );
    }

    #[test]
    fn test_mcopy_command_lists_entries() {
        let cmd = mcopy_command(
            Path::new("/img"),
            &[PathBuf::from("/stage/EFI"), PathBuf::from("/stage/foo")],
        );
        assert_eq!(cmd.command_line(), "mcopy -s -i /img /stage/EFI /stage/foo ::");
    }

    #[test]
    fn test_top_level_entries_sorted() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("b/nested")).unwrap();
        fs::write(temp.path().join("a"), "").unwrap();
        fs::write(temp.path().join("c"), "").unwrap();

        let entries = top_level_entries(temp.path()).unwrap();

        assert_eq!(
            entries,
            vec![
                temp.path().join("a"),
                temp.path().join("b"),
                temp.path().join("c"),
            ]
        );
    }

    #[test]
    fn test_mkfs_vfat_formats_fat32() {
        if crate::preflight::check_filesystem_tools("vfat").is_err() {
            eprintln!("skipping: vfat tools not available");
            return;
        }

        let temp = TempDir::new().unwrap();
        let img = temp.path().join("img");
        let contents = temp.path().join("contents");
        fs::create_dir_all(contents.join("EFI/boot")).unwrap();
        fs::write(contents.join("EFI/boot/grub.cfg"), "set timeout=3").unwrap();
        fs::File::create(&img).unwrap().set_len(64 * SIZE_MIB).unwrap();

        mkfs_vfat(&img, "SYSBOOT", &contents).unwrap();

        // FAT32 boot sector carries the filesystem type string at offset 82
        let mut file = fs::File::open(&img).unwrap();
        let mut fs_type = [0u8; 8];
        file.seek(SeekFrom::Start(82)).unwrap();
        file.read_exact(&mut fs_type).unwrap();
        assert_eq!(&fs_type, b"FAT32   ");
    }
}
