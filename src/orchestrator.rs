//! One invocation, start to finish.
//!
//! ```text
//! START -> CHECK_QUOTA -> EXIT_QUOTA
//!                      -> CHECK_PROBABILITY -> EXIT_SKIP
//!                                           -> RECORD -> COMMIT -> PUSH -> RESCHEDULE -> END
//! ```
//!
//! Every step blocks until its collaborator returns. Nothing is retried. A
//! failed push is logged and the run still reschedules; every other failure
//! ends the run.

use crate::clock::{Clock, SystemClock};
use crate::config::StreakConfig;
use crate::error::{Result, StreakError};
use crate::generator::{self, COMMIT_PROMPT, DeferredGenerator, MessageGenerator};
use crate::ledger::{DailyRecord, LedgerStore};
use crate::lock::RunLock;
use crate::policy::{Decision, DecisionPolicy};
use crate::scheduler::{CrontabCli, NextRun, Rescheduler, ScheduleTarget};
use crate::vcs::{GitCli, VersionControl};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Steps of a run, for logging. `ExitQuota`, `ExitSkip` and `End` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Start,
    CheckQuota,
    ExitQuota,
    CheckProbability,
    ExitSkip,
    Record,
    Commit,
    Push,
    Reschedule,
    End,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::CheckQuota => "check quota",
            Self::ExitQuota => "exit (quota)",
            Self::CheckProbability => "check probability",
            Self::ExitSkip => "exit (skip)",
            Self::Record => "record",
            Self::Commit => "commit",
            Self::Push => "push",
            Self::Reschedule => "reschedule",
            Self::End => "end",
        };
        f.write_str(name)
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Today's quota was already used up.
    QuotaExhausted { count: u32, limit: u32 },
    /// Under quota, but the probability gate said not now.
    Skipped { count: u32, limit: u32 },
    /// A contribution was recorded, committed and (maybe) pushed.
    Contributed {
        /// Ledger row after recording.
        record: DailyRecord,
        /// Commit message used.
        message: String,
        /// Whether the commit command succeeded.
        committed: bool,
        /// Whether the push succeeded.
        pushed: bool,
        /// When the next invocation is scheduled.
        next_run: NextRun,
    },
    /// Evaluation only; nothing was written.
    DryRun {
        count: u32,
        /// `None` when today's limit has not been drawn yet.
        limit: Option<u32>,
        decision: Decision,
    },
}

impl RunOutcome {
    /// Whether the run made a contribution.
    pub fn contributed(&self) -> bool {
        matches!(self, Self::Contributed { .. })
    }

    /// State the run stopped in. A dry run that would act stops after the
    /// probability check.
    pub fn terminal_state(&self) -> RunState {
        match self {
            Self::QuotaExhausted { .. }
            | Self::DryRun {
                decision: Decision::QuotaExhausted,
                ..
            } => RunState::ExitQuota,
            Self::Skipped { .. }
            | Self::DryRun {
                decision: Decision::Skip,
                ..
            } => RunState::ExitSkip,
            Self::DryRun {
                decision: Decision::Act,
                ..
            } => RunState::CheckProbability,
            Self::Contributed { .. } => RunState::End,
        }
    }
}

/// Sequences ledger, policy, commit, push and reschedule for one invocation.
pub struct Orchestrator {
    ledger: LedgerStore,
    policy: DecisionPolicy,
    vcs: Box<dyn VersionControl>,
    generator: Box<dyn MessageGenerator>,
    rescheduler: Rescheduler,
    clock: Box<dyn Clock>,
    rng: StdRng,
    prompt: String,
    stage_paths: Vec<String>,
    lock_path: Option<PathBuf>,
    dry_run: bool,
}

impl Orchestrator {
    /// Orchestrator over the given collaborators, with the system clock, an
    /// entropy-seeded RNG, the built-in prompt, `["."]` staged and no run lock.
    pub fn new(
        ledger: LedgerStore,
        policy: DecisionPolicy,
        vcs: Box<dyn VersionControl>,
        generator: Box<dyn MessageGenerator>,
        rescheduler: Rescheduler,
    ) -> Self {
        Self {
            ledger,
            policy,
            vcs,
            generator,
            rescheduler,
            clock: Box::new(SystemClock),
            rng: StdRng::from_entropy(),
            prompt: COMMIT_PROMPT.to_owned(),
            stage_paths: vec![".".to_owned()],
            lock_path: None,
            dry_run: false,
        }
    }

    /// Build the production wiring from config.
    ///
    /// `config_path` is baked into the cron line so rescheduled runs load the
    /// same file.
    pub fn from_config(config: &StreakConfig, config_path: Option<&Path>) -> Result<Self> {
        config.validate()?;
        let repo = config.repository_path()?.to_path_buf();

        let ledger = LedgerStore::new(
            config.ledger.path.clone(),
            config.policy.limit_min..=config.policy.limit_max,
        );
        let vcs = GitCli::locate(&config.repository.git_program, repo.clone()).with_push_target(
            config.repository.remote.clone(),
            config.repository.branch.clone(),
        );
        let generator = DeferredGenerator::new(config.generator.clone());
        let rescheduler = build_rescheduler(config, config_path)?;

        Ok(Self::new(
            ledger,
            DecisionPolicy::from(&config.policy),
            Box::new(vcs),
            Box::new(generator),
            rescheduler,
        )
        .with_prompt(config.generator.effective_prompt())
        .with_stage_paths(config.repository.stage_paths.clone())
        .with_lock(RunLock::path_for(&config.ledger.path)))
    }

    /// Use `clock` instead of the system clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Seed the random source (limits, probability gate, offsets).
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Prompt sent to the generator.
    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Paths staged before committing.
    #[must_use]
    pub fn with_stage_paths(mut self, paths: Vec<String>) -> Self {
        self.stage_paths = paths;
        self
    }

    /// Hold a run lock at `path` for the duration of [`run`](Self::run).
    #[must_use]
    pub fn with_lock(mut self, path: PathBuf) -> Self {
        self.lock_path = Some(path);
        self
    }

    /// Evaluate without recording, committing, pushing or rescheduling.
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Ledger store in use.
    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    /// Rescheduler in use.
    pub fn rescheduler(&self) -> &Rescheduler {
        &self.rescheduler
    }

    /// Run once.
    pub fn run(&mut self) -> Result<RunOutcome> {
        if self.dry_run {
            return self.evaluate();
        }

        self.enter(RunState::Start);
        let _lock = match &self.lock_path {
            Some(path) => Some(RunLock::acquire(path)?),
            None => None,
        };
        self.ledger.ensure_initialized()?;

        self.enter(RunState::CheckQuota);
        let count = self.ledger.read_today_count(self.clock.as_ref())?;
        let limit = self
            .ledger
            .read_today_limit(self.clock.as_ref(), &mut self.rng)?;

        match self.policy.decide(count, limit, &mut self.rng) {
            Decision::QuotaExhausted => {
                self.enter(RunState::ExitQuota);
                info!("daily limit reached ({count}/{limit}); no more contributions today");
                return Ok(RunOutcome::QuotaExhausted { count, limit });
            }
            Decision::Skip => {
                self.enter(RunState::CheckProbability);
                self.enter(RunState::ExitSkip);
                info!(
                    "skipping this run (p={}); {count}/{limit} so far today",
                    self.policy.act_probability()
                );
                return Ok(RunOutcome::Skipped { count, limit });
            }
            Decision::Act => self.enter(RunState::CheckProbability),
        }

        self.enter(RunState::Record);
        let record =
            self.ledger
                .write_today_count(self.clock.as_ref(), count.saturating_add(1), &mut self.rng)?;

        self.enter(RunState::Commit);
        self.vcs.stage(&self.stage_paths)?;
        let message = generator::generate_message(self.generator.as_ref(), &self.prompt)?;
        info!("commit message: {message}");
        let committed = self.vcs.commit(&message)?;

        self.enter(RunState::Push);
        let pushed = match self.vcs.push() {
            Ok(()) => {
                info!("changes pushed");
                true
            }
            Err(StreakError::Publish { stderr }) => {
                warn!("push failed, continuing: {stderr}");
                false
            }
            Err(e) => return Err(e),
        };

        self.enter(RunState::Reschedule);
        let next_run = self
            .rescheduler
            .reschedule(self.clock.as_ref(), &mut self.rng)?;

        self.enter(RunState::End);
        info!(
            "contribution {}/{} recorded for {}",
            record.contributions, record.daily_limit, record.date
        );
        Ok(RunOutcome::Contributed {
            record,
            message,
            committed,
            pushed,
            next_run,
        })
    }

    fn evaluate(&mut self) -> Result<RunOutcome> {
        let today = self.ledger.today(self.clock.as_ref())?;
        let count = today.map_or(0, |r| r.contributions);
        let limit = today.map(|r| r.daily_limit);
        // An undrawn limit is at least the lower bound of the draw.
        let effective_limit = limit.unwrap_or(*self.ledger.limits().start());
        let decision = self.policy.decide(count, effective_limit, &mut self.rng);
        info!("dry run: {count} contributions today, limit {limit:?}, decision {decision:?}");
        Ok(RunOutcome::DryRun {
            count,
            limit,
            decision,
        })
    }

    fn enter(&self, state: RunState) {
        info!("-> {state}");
    }
}

/// Rescheduler for the running executable, per config.
pub fn build_rescheduler(config: &StreakConfig, config_path: Option<&Path>) -> Result<Rescheduler> {
    let exe = std::env::current_exe()
        .map_err(|e| StreakError::Schedule(format!("cannot locate own executable: {e}")))?;
    let config_path = config_path.map(absolute);

    let mut target = ScheduleTarget::for_executable(
        exe,
        config_path,
        config.repository_path()?.to_path_buf(),
        config.schedule.log_file.clone(),
    );
    if let Some(marker) = &config.schedule.marker {
        target.marker = marker.clone();
    }

    Rescheduler::new(
        Box::new(CrontabCli::new(&config.schedule.crontab_program)),
        target,
        config.schedule.min_offset_minutes..=config.schedule.max_offset_minutes,
    )
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
