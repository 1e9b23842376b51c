//! Self-rescheduling: pick the next run time and install it as this
//! program's single line in the periodic-task table.

use super::crontab::{CrontabBackend, CrontabTable};
use super::tasks::{CronEntry, NextRun};
use crate::clock::Clock;
use crate::error::{Result, StreakError};
use rand::Rng;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use tracing::{debug, info};

/// What the installed line should run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleTarget {
    /// Directory the job runs in (the target repository).
    pub work_dir: PathBuf,
    /// Program plus arguments.
    pub command: Vec<String>,
    /// Append job output here, when set.
    pub log_file: Option<PathBuf>,
    /// Substring identifying this program's line in the table.
    pub marker: String,
}

impl ScheduleTarget {
    /// Target re-running `exe run --config <config>` in `work_dir`, marked by
    /// the executable path.
    pub fn for_executable(
        exe: PathBuf,
        config_path: Option<PathBuf>,
        work_dir: PathBuf,
        log_file: Option<PathBuf>,
    ) -> Self {
        let marker = exe.to_string_lossy().into_owned();
        let mut command = vec![marker.clone(), "run".to_owned()];
        if let Some(config) = config_path {
            command.push("--config".to_owned());
            command.push(config.to_string_lossy().into_owned());
        }
        Self {
            work_dir,
            command,
            log_file,
            marker,
        }
    }

    /// Cron line for the given minute.
    pub fn entry_at(&self, minute: u32) -> CronEntry {
        CronEntry {
            minute,
            work_dir: self.work_dir.clone(),
            command: self.command.clone(),
            log_file: self.log_file.clone(),
        }
    }
}

/// Result of rewriting the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Previous lines for this program that were dropped.
    pub removed: usize,
    /// The line now installed.
    pub line: String,
}

/// Owns this program's line in the periodic-task table.
pub struct Rescheduler {
    backend: Box<dyn CrontabBackend>,
    target: ScheduleTarget,
    offsets: RangeInclusive<u32>,
}

impl Rescheduler {
    /// Rescheduler writing `target` through `backend`, `offsets` minutes ahead.
    ///
    /// # Errors
    ///
    /// Returns [`StreakError::Schedule`] for an empty marker, which would
    /// match (and wipe) every line in the table.
    pub fn new(
        backend: Box<dyn CrontabBackend>,
        target: ScheduleTarget,
        offsets: RangeInclusive<u32>,
    ) -> Result<Self> {
        if target.marker.trim().is_empty() {
            return Err(StreakError::Schedule(
                "schedule marker must not be empty".to_owned(),
            ));
        }
        Ok(Self {
            backend,
            target,
            offsets,
        })
    }

    /// Install target.
    pub fn target(&self) -> &ScheduleTarget {
        &self.target
    }

    /// Draw the next run time.
    pub fn compute_next_run<R: Rng + ?Sized>(&self, clock: &dyn Clock, rng: &mut R) -> NextRun {
        NextRun::draw(clock.now(), self.offsets.clone(), rng)
    }

    /// Replace this program's line(s) with `entry`, keeping every other line.
    pub fn install_schedule(&self, entry: &CronEntry) -> Result<InstallReport> {
        let mut table = CrontabTable::parse(&self.backend.read()?);
        let removed = table.remove_matching(&self.target.marker);
        let line = entry.to_line();
        table.push(line.clone());
        self.backend.install(&table.render())?;
        debug!("installed cron line: {line}");
        Ok(InstallReport { removed, line })
    }

    /// Draw the next run and install it.
    pub fn reschedule<R: Rng + ?Sized>(&self, clock: &dyn Clock, rng: &mut R) -> Result<NextRun> {
        let next = self.compute_next_run(clock, rng);
        let report = self.install_schedule(&self.target.entry_at(next.minute()))?;
        info!(
            "next run {next} (replaced {} previous line{})",
            report.removed,
            if report.removed == 1 { "" } else { "s" }
        );
        Ok(next)
    }

    /// Remove this program's line(s). Returns how many were removed.
    pub fn unschedule(&self) -> Result<usize> {
        let mut table = CrontabTable::parse(&self.backend.read()?);
        let removed = table.remove_matching(&self.target.marker);
        if removed > 0 {
            self.backend.install(&table.render())?;
        }
        Ok(removed)
    }

    /// Lines currently installed for this program.
    pub fn installed_lines(&self) -> Result<Vec<String>> {
        let table = CrontabTable::parse(&self.backend.read()?);
        Ok(table
            .matching(&self.target.marker)
            .map(str::to_owned)
            .collect())
    }
}
