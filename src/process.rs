//! Single-value queries against external tools (blkid).
//!
//! Tools like `blkid -o value` print one value or nothing. A query runs
//! the tool with stdin closed, fails with its stderr on a non-zero exit,
//! and maps empty output to None.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// A command whose trimmed stdout is the answer.
pub struct Cmd {
    program: PathBuf,
    args: Vec<String>,
    /// Prefix for the error when the tool exits non-zero
    what: String,
}

impl Cmd {
    pub fn new(program: impl AsRef<Path>) -> Self {
        let program = program.as_ref().to_path_buf();
        let what = format!("'{}' failed", program.display());
        Self {
            program,
            args: Vec::new(),
            what,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_string()));
        self
    }

    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.to_string_lossy().into_owned());
        self
    }

    /// Describe the query for error messages, e.g. "blkid failed on /dev/sda1".
    pub fn error_msg(mut self, msg: impl Into<String>) -> Self {
        self.what = msg.into();
        self
    }

    /// Run and return the trimmed stdout, None if the tool printed nothing.
    pub fn read_value(self) -> Result<Option<String>> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| {
                format!(
                    "Failed to execute '{}'. Is it installed?",
                    self.program.display()
                )
            })?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            if stderr.is_empty() {
                bail!("{} (exit code {})", self.what, code);
            }
            bail!("{} (exit code {}):\n{}", self.what, code, stderr);
        }

        let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(Some(value).filter(|v| !v.is_empty()))
    }
}

/// Locate a program in PATH or the usual sbin directories.
///
/// sbin is often missing from an unprivileged user's PATH, which is exactly
/// where blkid lives.
pub fn find_program(program: &str) -> Option<PathBuf> {
    if let Ok(path) = which::which(program) {
        return Some(path);
    }
    ["/usr/sbin", "/sbin", "/usr/bin", "/bin"]
        .iter()
        .map(|dir| Path::new(dir).join(program))
        .find(|candidate| candidate.is_file())
}
