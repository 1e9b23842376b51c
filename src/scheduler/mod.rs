//! Self-rescheduling through the host's periodic-task table (cron).
//!
//! After a successful contribution the program draws a random offset
//! (15-45 minutes by default) and replaces its own cron line so the next
//! invocation lands at that minute.

pub mod crontab;
pub mod runner;
pub mod tasks;

pub use crontab::{CrontabBackend, CrontabCli, CrontabTable};
pub use runner::{InstallReport, Rescheduler, ScheduleTarget};
pub use tasks::{CronEntry, NextRun};
