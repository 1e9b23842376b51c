//! The next-run time and the cron line that triggers it.

use chrono::{DateTime, Duration, Local, Timelike};
use rand::Rng;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

/// When the next invocation should happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextRun {
    /// Minutes from now.
    pub minute_offset: u32,
    /// Wall-clock time of the next run.
    pub at: DateTime<Local>,
}

impl NextRun {
    /// Draw a uniform offset from `offsets` (minutes) and add it to `now`.
    pub fn draw<R: Rng + ?Sized>(
        now: DateTime<Local>,
        offsets: RangeInclusive<u32>,
        rng: &mut R,
    ) -> Self {
        let minute_offset = rng.gen_range(offsets);
        Self {
            minute_offset,
            at: now + Duration::minutes(i64::from(minute_offset)),
        }
    }

    /// Minute-of-hour field for the cron line.
    pub fn minute(&self) -> u32 {
        self.at.minute()
    }
}

impl std::fmt::Display for NextRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "in {} minutes (at {})",
            self.minute_offset,
            self.at.format("%H:%M")
        )
    }
}

/// One line of the periodic-task table invoking this program.
///
/// Only the minute is pinned: the line fires hourly at that minute until the
/// next successful run replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronEntry {
    /// Minute of the hour (0-59).
    pub minute: u32,
    /// Directory the command runs in.
    pub work_dir: PathBuf,
    /// Program plus arguments.
    pub command: Vec<String>,
    /// Append stdout and stderr here, when set.
    pub log_file: Option<PathBuf>,
}

impl CronEntry {
    /// Render as a crontab line (no trailing newline).
    pub fn to_line(&self) -> String {
        let command = self
            .command
            .iter()
            .map(|part| shell_quote(part))
            .collect::<Vec<_>>()
            .join(" ");
        let mut line = format!(
            "{} * * * * cd {} && {command}",
            self.minute,
            shell_quote_path(&self.work_dir)
        );
        if let Some(log) = &self.log_file {
            line.push_str(&format!(" >> {} 2>&1", shell_quote_path(log)));
        }
        line
    }
}

impl std::fmt::Display for CronEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_line())
    }
}

/// Quote for `/bin/sh`, leaving plain words untouched.
pub(crate) fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@+,".contains(c));
    if plain {
        return word.to_owned();
    }
    format!("'{}'", word.replace('\'', r"'\''"))
}

fn shell_quote_path(path: &Path) -> String {
    shell_quote(&path.to_string_lossy())
}
