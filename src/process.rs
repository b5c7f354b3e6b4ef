//! Running host tools with captured output.
//!
//! Filesystem builders shell out to tools like `mkfs.ext4` and `mcopy`.
//! Failures must carry what the tool printed, so output is always captured
//! and folded into the error.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::{Command, ExitStatus};

/// Result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code, or -1 if terminated by a signal.
    pub fn code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }

    /// stdout and stderr joined, trimmed.
    pub fn combined_output(&self) -> String {
        let stdout = self.stdout.trim();
        let stderr = self.stderr.trim();
        match (stdout.is_empty(), stderr.is_empty()) {
            (true, true) => String::new(),
            (false, true) => stdout.to_string(),
            (true, false) => stderr.to_string(),
            (false, false) => format!("{stdout}\n{stderr}"),
        }
    }
}

/// Builder for a host tool invocation.
#[derive(Debug, Clone)]
pub struct Cmd {
    program: String,
    args: Vec<String>,
    error_prefix: Option<String>,
}

impl Cmd {
    pub fn new(program: impl AsRef<str>) -> Self {
        Self {
            program: program.as_ref().to_string(),
            args: Vec::new(),
            error_prefix: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_string());
        }
        self
    }

    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.to_string_lossy().into_owned());
        self
    }

    /// Prefix used in the error when the command exits non-zero.
    pub fn error_msg(mut self, msg: impl AsRef<str>) -> Self {
        self.error_prefix = Some(msg.as_ref().to_string());
        self
    }

    /// Full command line, for logging.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run to completion, failing on a non-zero exit with the tool's output.
    pub fn run(self) -> Result<CommandResult> {
        tracing::debug!("Running: {}", self.command_line());

        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .with_context(|| format!("cannot execute '{}'. Is it installed?", self.program))?;

        let result = CommandResult {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.success() {
            let prefix = self
                .error_prefix
                .unwrap_or_else(|| format!("'{}' failed", self.program));
            let combined = result.combined_output();
            if combined.is_empty() {
                bail!("{} (exit code {})", prefix, result.code());
            }
            bail!("{} (exit code {}): {}", prefix, result.code(), combined);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_success() {
        let result = Cmd::new("echo").args(["hello", "world"]).run().unwrap();
        assert!(result.success());
        assert_eq!(result.stdout.trim(), "hello world");
    }

    #[test]
    fn test_failure_includes_output() {
        let err = Cmd::new("sh")
            .args(["-c", "echo to-stdout; echo to-stderr >&2; exit 3"])
            .error_msg("mkfs exploded")
            .run()
            .unwrap_err();

        let msg = err.to_string();
        assert!(msg.starts_with("mkfs exploded (exit code 3): "), "{msg}");
        assert!(msg.contains("to-stdout"));
        assert!(msg.contains("to-stderr"));
    }

    #[test]
    fn test_failure_without_output() {
        let err = Cmd::new("false").run().unwrap_err();
        assert_eq!(err.to_string(), "'false' failed (exit code 1)");
    }

    #[test]
    fn test_missing_program() {
        let err = Cmd::new("definitely_not_a_real_command_12345").run().unwrap_err();
        assert!(err.to_string().contains("Is it installed?"));
    }

    #[test]
    fn test_command_line() {
        let cmd = Cmd::new("mkfs.ext4")
            .args(["-T", "default"])
            .arg_path(Path::new("/tmp/img"));
        assert_eq!(cmd.command_line(), "mkfs.ext4 -T default /tmp/img");
    }
}
