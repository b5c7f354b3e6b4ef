//! Preflight checks for filesystem builders.
//!
//! The built-in builders shell out to host tools. Checking for them before a
//! write turns a cryptic exec failure halfway through into a clear list of
//! what to install.
//!
//! # Example
//!
//! ```rust
//! use fsimage::preflight::{command_exists, check_filesystem_tools};
//!
//! if !command_exists("mkfs.ext4") {
//!     println!("e2fsprogs not installed");
//! }
//!
//! if let Err(e) = check_filesystem_tools("vfat") {
//!     eprintln!("{}", e);
//! }
//! ```

use anyhow::{bail, Result};

/// Check if a command exists in PATH.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Host tools needed by the built-in builder for `filesystem`.
///
/// Each tuple is (command_name, package_name). Unknown or custom filesystem
/// types need nothing as far as preflight is concerned.
pub fn required_tools(filesystem: &str) -> Vec<(&'static str, &'static str)> {
    match filesystem {
        "ext4" => {
            let mut tools = vec![("mkfs.ext4", "e2fsprogs")];
            if !crate::mkfs::running_as_root() {
                tools.push(("fakeroot", "fakeroot"));
            }
            tools
        }
        "vfat" => vec![("mkfs.vfat", "dosfstools"), ("mcopy", "mtools")],
        _ => vec![],
    }
}

/// Check that specific tools are available.
///
/// Fails with every missing tool and the package providing it.
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<()> {
    let missing = tools
        .iter()
        .filter(|(tool, _)| !command_exists(tool))
        .map(|(tool, package)| format!("  {} (install: {})", tool, package))
        .collect::<Vec<_>>();

    if !missing.is_empty() {
        bail!("Missing required host tools:\n{}", missing.join("\n"));
    }

    Ok(())
}

/// Check the tools for the built-in builder of `filesystem`.
pub fn check_filesystem_tools(filesystem: &str) -> Result<()> {
    check_required_tools(&required_tools(filesystem))
}
