//! CLI binary for streak.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use streak::clock::{Clock, SystemClock};
use streak::ledger::LedgerStore;
use streak::orchestrator::build_rescheduler;
use streak::{Orchestrator, RunOutcome, StreakConfig};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Streak: record, commit, push and reschedule one contribution at a time.
#[derive(Parser)]
#[command(name = "streak", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, env = "STREAK_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Also write daily-rolling log files into this directory.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Run one pass: check quota, maybe contribute, reschedule.
    Run {
        /// Evaluate quota and probability only; write nothing.
        #[arg(long)]
        dry_run: bool,

        /// Seed the random source.
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show today's ledger record and the installed cron line.
    Status,

    /// Install the cron line now without contributing.
    Schedule,

    /// Remove this program's cron line.
    Unschedule,

    /// Write a default configuration file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = load_config(cli.config.as_deref());
    let (log_dir, filter) = match &loaded {
        Ok((config, _)) => (
            cli.log_dir.clone().or_else(|| config.logging.dir.clone()),
            config.logging.filter.clone(),
        ),
        Err(_) => (cli.log_dir.clone(), None),
    };
    let _log_guard = init_tracing(log_dir.as_deref(), filter.as_deref());

    let command = cli.command.unwrap_or(Command::Run {
        dry_run: false,
        seed: None,
    });
    // init-config must work even when the existing file does not parse.
    let result = match command {
        Command::InitConfig { force } => init_config(cli.config.as_deref(), force),
        Command::Run { dry_run, seed } => {
            loaded.and_then(|(config, path)| run(&config, path.as_deref(), dry_run, seed))
        }
        Command::Status => loaded.and_then(|(config, path)| status(&config, path.as_deref())),
        Command::Schedule => loaded.and_then(|(config, path)| schedule(&config, path.as_deref())),
        Command::Unschedule => {
            loaded.and_then(|(config, path)| unschedule(&config, path.as_deref()))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Load the config from `--config`, else the default path when it exists,
/// else built-in defaults. Returns the file actually read, if any.
fn load_config(explicit: Option<&Path>) -> anyhow::Result<(StreakConfig, Option<PathBuf>)> {
    if let Some(path) = explicit {
        if !path.exists() {
            // init-config creates it; every other command reports the error later.
            return Ok((StreakConfig::default(), Some(path.to_path_buf())));
        }
        let config = StreakConfig::from_file(path)
            .with_context(|| format!("cannot load config {}", path.display()))?;
        return Ok((config, Some(path.to_path_buf())));
    }

    let default_path = StreakConfig::default_config_path();
    if default_path.exists() {
        let config = StreakConfig::from_file(&default_path)
            .with_context(|| format!("cannot load config {}", default_path.display()))?;
        return Ok((config, Some(default_path)));
    }
    Ok((StreakConfig::default(), None))
}

fn require_file(path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(p) if !p.exists() => anyhow::bail!(
            "config file {} does not exist (create it with `streak init-config`)",
            p.display()
        ),
        _ => Ok(()),
    }
}

fn init_tracing(
    log_dir: Option<&Path>,
    default_filter: Option<&str>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter.unwrap_or("streak=info")));

    let appender = log_dir.and_then(|dir| {
        tracing_appender::rolling::RollingFileAppender::builder()
            .rotation(tracing_appender::rolling::Rotation::DAILY)
            .filename_prefix("streak")
            .filename_suffix("log")
            .build(dir)
            .map_err(|e| eprintln!("cannot open log directory {}: {e}", dir.display()))
            .ok()
    });

    let (file_layer, guard) = match appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

fn run(
    config: &StreakConfig,
    config_path: Option<&Path>,
    dry_run: bool,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    require_file(config_path)?;
    let mut orchestrator = Orchestrator::from_config(config, config_path)?.dry_run(dry_run);
    if let Some(seed) = seed {
        orchestrator = orchestrator.with_seed(seed);
    }

    match orchestrator.run()? {
        RunOutcome::QuotaExhausted { count, limit } => {
            println!("Daily limit reached ({count}/{limit}). No more contributions today.");
        }
        RunOutcome::Skipped { .. } => println!("Skipping execution based on random chance."),
        RunOutcome::Contributed {
            record,
            message,
            pushed,
            next_run,
            ..
        } => {
            println!(
                "Contribution {}/{} for {}: {message}",
                record.contributions, record.daily_limit, record.date
            );
            if !pushed {
                println!("Push failed; the commit stays local until the next successful push.");
            }
            println!("Next run {next_run}.");
        }
        RunOutcome::DryRun {
            count,
            limit,
            decision,
        } => {
            let limit = limit.map_or_else(|| "not drawn yet".to_owned(), |l| l.to_string());
            println!("Dry run: {count} today, limit {limit}, decision {decision:?}.");
        }
    }
    Ok(())
}

fn status(config: &StreakConfig, config_path: Option<&Path>) -> anyhow::Result<()> {
    let store = LedgerStore::new(
        config.ledger.path.clone(),
        config.policy.limit_min..=config.policy.limit_max,
    );
    let ledger = store.load()?;
    let today = SystemClock.today();

    println!("Ledger: {}", store.path().display());
    match ledger.get(today) {
        Some(record) => println!(
            "Today ({today}): {}/{} contributions{}",
            record.contributions,
            record.daily_limit,
            if record.quota_exhausted() { " (limit reached)" } else { "" }
        ),
        None => println!("Today ({today}): no record yet"),
    }
    let total: u64 = ledger
        .records()
        .iter()
        .map(|r| u64::from(r.contributions))
        .sum();
    println!("History: {} days, {total} contributions", ledger.len());

    if config.repository_path().is_ok() {
        let lines = build_rescheduler(config, config_path)?.installed_lines()?;
        if lines.is_empty() {
            println!("Schedule: not installed");
        }
        for line in lines {
            println!("Schedule: {line}");
        }
    }
    Ok(())
}

fn schedule(config: &StreakConfig, config_path: Option<&Path>) -> anyhow::Result<()> {
    require_file(config_path)?;
    config.validate()?;
    let rescheduler = build_rescheduler(config, config_path)?;
    let next = rescheduler.reschedule(&SystemClock, &mut rand::thread_rng())?;
    println!("Scheduled next run {next}.");
    Ok(())
}

fn unschedule(config: &StreakConfig, config_path: Option<&Path>) -> anyhow::Result<()> {
    let removed = build_rescheduler(config, config_path)?.unschedule()?;
    println!("Removed {removed} cron line(s).");
    Ok(())
}

fn init_config(explicit: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = explicit.map_or_else(StreakConfig::default_config_path, Path::to_path_buf);
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    StreakConfig::default().save_to_file(&path)?;
    println!(
        "Wrote {}. Set repository.path before running.",
        path.display()
    );
    Ok(())
}
