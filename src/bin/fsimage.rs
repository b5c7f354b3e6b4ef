use std::path::Path;

use anyhow::{bail, Context, Result};
use fsimage::{layout, mkfs, preflight, FilesystemImageWriter};
use tracing_subscriber::EnvFilter;

fn usage() -> &'static str {
    "Usage:\n  fsimage write <structure.toml> <content-dir> <work-dir> <image>\n  fsimage handlers\n  fsimage preflight <filesystem>"
}

/// A parsed command line.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Write {
        descriptor: &'a Path,
        content_dir: &'a Path,
        work_dir: &'a Path,
        image: &'a Path,
    },
    Handlers,
    Preflight(&'a str),
}

fn parse_args(args: &[String]) -> Result<Command<'_>> {
    match args {
        [write, descriptor, content_dir, work_dir, image] if write == "write" => {
            Ok(Command::Write {
                descriptor: Path::new(descriptor),
                content_dir: Path::new(content_dir),
                work_dir: Path::new(work_dir),
                image: Path::new(image),
            })
        }
        [handlers] if handlers == "handlers" => Ok(Command::Handlers),
        [check, filesystem] if check == "preflight" => Ok(Command::Preflight(filesystem)),
        _ => bail!(usage()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    match parse_args(&args)? {
        Command::Write {
            descriptor,
            content_dir,
            work_dir,
            image,
        } => write_image(descriptor, content_dir, work_dir, image),
        Command::Handlers => {
            for name in mkfs::registered() {
                println!("{name}");
            }
            Ok(())
        }
        Command::Preflight(filesystem) => {
            preflight::check_filesystem_tools(filesystem)?;
            println!("[preflight] all tools for '{filesystem}' present");
            Ok(())
        }
    }
}

fn write_image(descriptor: &Path, content_dir: &Path, work_dir: &Path, image: &Path) -> Result<()> {
    let structure = layout::load_structure(descriptor)?;
    let filesystem = structure.filesystem.clone();
    let index = structure.index;

    preflight::check_filesystem_tools(&filesystem)
        .with_context(|| format!("checking host tools for '{filesystem}'"))?;

    println!(
        "[fsimage] structure #{index} '{}': {} bytes, {filesystem}",
        structure.name, structure.size
    );

    let writer = FilesystemImageWriter::new(content_dir, Some(structure.into_shared()), work_dir)?;
    writer
        .write(image, None)
        .with_context(|| format!("writing structure #{index} to '{}'", image.display()))?;

    println!("[fsimage] wrote {filesystem} filesystem to {}", image.display());
    Ok(())
}
