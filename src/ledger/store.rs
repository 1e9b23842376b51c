//! File-backed ledger store.
//!
//! Reads the whole CSV on every call and rewrites it whole on every change.
//! Rewrites go through a sibling temp file and a rename, so a crash never
//! leaves a half-written ledger behind.

use super::record::{DailyRecord, Ledger};
use crate::clock::Clock;
use crate::error::{Result, StreakError};
use rand::Rng;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Owner of the ledger file.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
    limits: RangeInclusive<u32>,
}

impl LedgerStore {
    /// Store over `path`, drawing new daily limits uniformly from `limits`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, limits: RangeInclusive<u32>) -> Self {
        Self {
            path: path.into(),
            limits,
        }
    }

    /// Ledger file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Range new daily limits are drawn from.
    pub fn limits(&self) -> &RangeInclusive<u32> {
        &self.limits
    }

    /// Create the ledger with just a header row if it does not exist. Idempotent.
    pub fn ensure_initialized(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        debug!("creating ledger at {}", self.path.display());
        self.store(&Ledger::default())
    }

    /// Load and parse the whole ledger. A missing file reads as empty and is
    /// not created.
    pub fn load(&self) -> Result<Ledger> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Ledger::default()),
            Err(e) => {
                return Err(StreakError::Ledger(format!(
                    "cannot read {}: {e}",
                    self.path.display()
                )));
            }
        };
        Ledger::parse(&text)
    }

    /// Today's record, if one exists.
    pub fn today(&self, clock: &dyn Clock) -> Result<Option<DailyRecord>> {
        Ok(self.load()?.get(clock.today()).copied())
    }

    /// Contributions recorded for today, or 0 when today has no record yet.
    pub fn read_today_count(&self, clock: &dyn Clock) -> Result<u32> {
        Ok(self.today(clock)?.map_or(0, |r| r.contributions))
    }

    /// Today's daily limit.
    ///
    /// When today has no record yet, a limit is drawn and persisted with a
    /// zero count, so later reads and writes for the same date see the same
    /// limit.
    pub fn read_today_limit<R: Rng + ?Sized>(&self, clock: &dyn Clock, rng: &mut R) -> Result<u32> {
        let today = clock.today();
        let mut ledger = self.load()?;
        if let Some(record) = ledger.get(today) {
            return Ok(record.daily_limit);
        }

        let record = ledger.set_count(today, 0, || self.draw_limit(rng));
        self.store(&ledger)?;
        debug!("drew daily limit {} for {today}", record.daily_limit);
        Ok(record.daily_limit)
    }

    /// Set today's contribution count, creating today's record (with a freshly
    /// drawn limit) when it does not exist. Returns the stored record.
    pub fn write_today_count<R: Rng + ?Sized>(
        &self,
        clock: &dyn Clock,
        contributions: u32,
        rng: &mut R,
    ) -> Result<DailyRecord> {
        let today = clock.today();
        let mut ledger = self.load()?;
        let record = ledger.set_count(today, contributions, || self.draw_limit(rng));
        self.store(&ledger)?;
        debug!(
            "recorded {}/{} contributions for {today}",
            record.contributions, record.daily_limit
        );
        Ok(record)
    }

    fn draw_limit<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.gen_range(self.limits.clone())
    }

    fn store(&self, ledger: &Ledger) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StreakError::Ledger(format!(
                    "cannot create ledger directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        self.write_atomic(&ledger.render())
    }

    fn write_atomic(&self, contents: &str) -> Result<()> {
        let mut tmp_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        std::fs::write(&tmp_path, contents).map_err(|e| {
            StreakError::Ledger(format!("cannot write {}: {e}", tmp_path.display()))
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            StreakError::Ledger(format!("cannot replace {}: {e}", self.path.display()))
        })?;
        Ok(())
    }
}
