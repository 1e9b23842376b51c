//! Shared fakes and fixtures for integration tests.

use chrono::NaiveDate;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use streak::clock::FixedClock;
use streak::generator::MessageGenerator;
use streak::ledger::LedgerStore;
use streak::policy::DecisionPolicy;
use streak::scheduler::{CrontabBackend, Rescheduler, ScheduleTarget};
use streak::vcs::VersionControl;
use streak::{Orchestrator, StreakError};

/// Marker the fake schedule target uses.
pub(crate) const EXE: &str = "/opt/streak/bin/streak";

/// Records every call; push fails with `push_stderr` when set.
#[derive(Clone, Default)]
pub(crate) struct FakeVcs {
    pub calls: Rc<RefCell<Vec<String>>>,
    pub push_stderr: Option<String>,
}

impl VersionControl for FakeVcs {
    fn stage(&self, paths: &[String]) -> streak::Result<()> {
        self.calls.borrow_mut().push(format!("add {}", paths.join(" ")));
        Ok(())
    }

    fn commit(&self, message: &str) -> streak::Result<bool> {
        self.calls.borrow_mut().push(format!("commit {message}"));
        Ok(true)
    }

    fn push(&self) -> streak::Result<()> {
        self.calls.borrow_mut().push("push".to_owned());
        match &self.push_stderr {
            Some(stderr) => Err(StreakError::Publish {
                stderr: stderr.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Returns the same text for every prompt.
pub(crate) struct FakeGenerator(pub String);

impl MessageGenerator for FakeGenerator {
    fn name(&self) -> &str {
        "fake"
    }

    fn generate(&self, _prompt: &str) -> streak::Result<String> {
        Ok(self.0.clone())
    }
}

/// In-memory periodic-task table.
#[derive(Clone, Default)]
pub(crate) struct MemoryCrontab {
    pub table: Rc<RefCell<String>>,
}

impl MemoryCrontab {
    pub fn with_table(text: &str) -> Self {
        let crontab = Self::default();
        *crontab.table.borrow_mut() = text.to_owned();
        crontab
    }

    pub fn text(&self) -> String {
        self.table.borrow().clone()
    }
}

impl CrontabBackend for MemoryCrontab {
    fn read(&self) -> streak::Result<String> {
        Ok(self.table.borrow().clone())
    }

    fn install(&self, table: &str) -> streak::Result<()> {
        *self.table.borrow_mut() = table.to_owned();
        Ok(())
    }
}

pub(crate) fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 10, day).expect("valid date")
}

pub(crate) fn clock(day: u32) -> FixedClock {
    FixedClock::at(date(day), 10, 0).expect("valid local time")
}

pub(crate) fn target() -> ScheduleTarget {
    ScheduleTarget::for_executable(
        PathBuf::from(EXE),
        Some(PathBuf::from("/etc/streak/config.toml")),
        PathBuf::from("/srv/repo"),
        None,
    )
}

/// Everything a scenario needs to inspect after a run.
pub(crate) struct Harness {
    pub dir: tempfile::TempDir,
    pub vcs: FakeVcs,
    pub crontab: MemoryCrontab,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
            vcs: FakeVcs::default(),
            crontab: MemoryCrontab::default(),
        }
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.dir.path().join("contributions.csv")
    }

    pub fn store(&self) -> LedgerStore {
        LedgerStore::new(self.ledger_path(), 3..=12)
    }

    pub fn seed_ledger(&self, text: &str) {
        std::fs::write(self.ledger_path(), text).expect("write ledger");
    }

    /// Orchestrator on day `day` with act probability `p` and generator text `generated`.
    pub fn orchestrator(&self, day: u32, p: f64, generated: &str) -> Orchestrator {
        self.orchestrator_with(day, p, Box::new(FakeGenerator(generated.to_owned())))
    }

    pub fn orchestrator_with(
        &self,
        day: u32,
        p: f64,
        generator: Box<dyn MessageGenerator>,
    ) -> Orchestrator {
        let rescheduler = Rescheduler::new(Box::new(self.crontab.clone()), target(), 15..=45)
            .expect("valid rescheduler");
        Orchestrator::new(
            self.store(),
            DecisionPolicy::new(p),
            Box::new(self.vcs.clone()),
            generator,
            rescheduler,
        )
        .with_clock(Box::new(clock(day)))
        .with_seed(17)
    }

    pub fn calls(&self) -> Vec<String> {
        self.vcs.calls.borrow().clone()
    }
}
