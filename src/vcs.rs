//! Version-control collaborator: stage, commit, push.
//!
//! Staging and committing are best-effort: a non-zero exit is logged and the
//! run carries on. A failed push surfaces as [`StreakError::Publish`] so the
//! caller can log it and still reschedule.

use crate::error::{Result, StreakError};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::{debug, warn};

/// Operations a run needs from the version-control tool.
pub trait VersionControl {
    /// Stage the given paths (`"."` for the whole working tree).
    fn stage(&self, paths: &[String]) -> Result<()>;

    /// Create a commit. Returns `false` when the tool reported failure.
    fn commit(&self, message: &str) -> Result<bool>;

    /// Publish to the remote.
    ///
    /// # Errors
    ///
    /// [`StreakError::Publish`] carrying captured stderr on non-zero exit.
    fn push(&self) -> Result<()>;
}

/// `git` command-line client bound to one working directory.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
    work_dir: PathBuf,
    remote: Option<String>,
    branch: Option<String>,
}

impl GitCli {
    /// Client using `program`, resolved through `PATH` when it is a bare name.
    pub fn locate(program: &str, work_dir: impl Into<PathBuf>) -> Self {
        let resolved = which::which(program).unwrap_or_else(|_| PathBuf::from(program));
        Self::with_program(resolved, work_dir)
    }

    /// Client using an explicit binary.
    pub fn with_program(program: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            work_dir: work_dir.into(),
            remote: None,
            branch: None,
        }
    }

    /// Push to `remote` (and `branch`, if given) instead of the tracking remote.
    #[must_use]
    pub fn with_push_target(mut self, remote: Option<String>, branch: Option<String>) -> Self {
        self.remote = remote;
        self.branch = branch;
        self
    }

    /// Repository working directory.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Arguments passed to `git` for a push.
    pub fn push_args(&self) -> Vec<String> {
        let mut args = vec!["push".to_owned()];
        if let Some(remote) = &self.remote {
            args.push(remote.clone());
            if let Some(branch) = &self.branch {
                args.push(branch.clone());
            }
        }
        args
    }

    fn run<S: AsRef<std::ffi::OsStr>>(&self, args: &[S]) -> Result<Output> {
        let argv: Vec<_> = args
            .iter()
            .map(|a| a.as_ref().to_string_lossy().into_owned())
            .collect();
        debug!("{} {}", self.program.display(), argv.join(" "));

        Command::new(&self.program)
            .args(args)
            .current_dir(&self.work_dir)
            .output()
            .map_err(|e| {
                StreakError::Vcs(format!(
                    "failed to run {} {}: {e}",
                    self.program.display(),
                    argv.first().map_or("", String::as_str)
                ))
            })
    }
}

impl VersionControl for GitCli {
    fn stage(&self, paths: &[String]) -> Result<()> {
        let mut args = vec!["add".to_owned(), "--".to_owned()];
        args.extend(paths.iter().cloned());
        let output = self.run(args.as_slice())?;
        if !output.status.success() {
            warn!(
                "git add exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<bool> {
        let output = self.run(["commit", "-m", message].as_slice())?;
        if output.status.success() {
            debug!("{}", String::from_utf8_lossy(&output.stdout).trim());
            return Ok(true);
        }
        warn!(
            "git commit exited with {}: {}{}",
            output.status,
            String::from_utf8_lossy(&output.stdout).trim(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
        Ok(false)
    }

    fn push(&self) -> Result<()> {
        let args = self.push_args();
        let output = self.run(args.as_slice())?;
        if output.status.success() {
            return Ok(());
        }
        Err(StreakError::Publish {
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        })
    }
}
