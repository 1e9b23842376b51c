//! Periodic-task table access.
//!
//! [`CrontabTable`] is the in-memory line list; [`CrontabBackend`] reads and
//! installs it. [`CrontabCli`] drives the host `crontab` program, staging the
//! new table in a temp file that is removed once loaded.

use crate::error::{Result, StreakError};
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Lines of a periodic-task table, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrontabTable {
    lines: Vec<String>,
}

impl CrontabTable {
    /// Split table text into lines. Blank trailing lines are dropped.
    pub fn parse(text: &str) -> Self {
        let mut lines: Vec<String> = text.lines().map(str::to_owned).collect();
        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }
        Self { lines }
    }

    /// Drop every line containing `marker`. Returns how many were removed.
    pub fn remove_matching(&mut self, marker: &str) -> usize {
        let before = self.lines.len();
        self.lines.retain(|line| !line.contains(marker));
        before - self.lines.len()
    }

    /// Append a line.
    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Lines containing `marker`.
    pub fn matching<'a>(&'a self, marker: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.lines
            .iter()
            .map(String::as_str)
            .filter(move |line| line.contains(marker))
    }

    /// All lines.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Table text; every line newline-terminated (cron ignores an unterminated last line).
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

/// Reads and installs the host's periodic-task table.
pub trait CrontabBackend {
    /// Current table text. A missing table reads as empty.
    fn read(&self) -> Result<String>;

    /// Replace the table and load it into the scheduler.
    fn install(&self, table: &str) -> Result<()>;
}

/// `crontab -l` / `crontab <file>`.
#[derive(Debug, Clone)]
pub struct CrontabCli {
    program: PathBuf,
}

impl CrontabCli {
    /// Backend using `program` (resolved through `PATH` when it is a bare name).
    pub fn new(program: &str) -> Self {
        let program = which::which(program).unwrap_or_else(|_| PathBuf::from(program));
        Self { program }
    }
}

impl CrontabBackend for CrontabCli {
    fn read(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .arg("-l")
            .output()
            .map_err(|e| {
                StreakError::Schedule(format!("failed to run {} -l: {e}", self.program.display()))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_missing_table(&stderr) {
                debug!(
                    "{} -l: {}; starting from an empty table",
                    self.program.display(),
                    stderr.trim()
                );
                return Ok(String::new());
            }
            // Never overwrite a table that could not be read.
            return Err(StreakError::Schedule(format!(
                "{} -l exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn install(&self, table: &str) -> Result<()> {
        let mut staged = tempfile::Builder::new()
            .prefix("streak-crontab-")
            .tempfile()
            .map_err(|e| StreakError::Schedule(format!("cannot create temp table: {e}")))?;
        staged
            .write_all(table.as_bytes())
            .and_then(|()| staged.flush())
            .map_err(|e| StreakError::Schedule(format!("cannot write temp table: {e}")))?;

        let output = Command::new(&self.program)
            .arg(staged.path())
            .output()
            .map_err(|e| {
                StreakError::Schedule(format!("failed to run {}: {e}", self.program.display()))
            })?;

        if !output.status.success() {
            return Err(StreakError::Schedule(format!(
                "{} rejected the new table ({}): {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

/// `crontab -l` reports a user without a table as `no crontab for <user>`.
fn is_missing_table(stderr: &str) -> bool {
    stderr.to_ascii_lowercase().contains("no crontab for")
}
