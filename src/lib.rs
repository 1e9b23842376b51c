//! Streak: keeps a repository's contribution graph looking organically busy.
//!
//! Each invocation is one pass of a small state machine:
//! Ledger → Policy → Commit → Push → Reschedule
//!
//! # Architecture
//!
//! - **Ledger**: per-date contribution counters and daily limits in a CSV file
//! - **Policy**: quota check plus a probabilistic act gate
//! - **Generator**: conventional-commit message text from a model or command
//! - **VCS**: `git add` / `commit` / `push` in the target repository
//! - **Scheduler**: replaces this program's cron line with a randomized next run
//! - **Orchestrator**: sequences the above once per invocation

pub mod clock;
pub mod config;
pub mod error;
pub mod generator;
pub mod ledger;
pub mod lock;
pub mod orchestrator;
pub mod policy;
pub mod scheduler;
pub mod streak_dirs;
pub mod vcs;

pub use config::StreakConfig;
pub use error::{Result, StreakError};
pub use orchestrator::{Orchestrator, RunOutcome, RunState};
