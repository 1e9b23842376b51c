//! Configuration types for a contribution run.

use crate::error::{Result, StreakError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration, loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreakConfig {
    /// Target repository settings.
    pub repository: RepositoryConfig,
    /// Quota and probability gate.
    pub policy: PolicyConfig,
    /// Contribution ledger location.
    pub ledger: LedgerConfig,
    /// Commit message generator.
    pub generator: GeneratorConfig,
    /// Self-rescheduling via the periodic-task table.
    pub schedule: ScheduleConfig,
    /// Log output.
    pub logging: LoggingConfig,
}

/// Repository the run commits to and pushes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Working directory of the repository. Required for `run` and `schedule`.
    pub path: PathBuf,
    /// Paths passed to `git add`. `["."]` stages everything.
    pub stage_paths: Vec<String>,
    /// Remote passed to `git push` (None = tracking remote).
    pub remote: Option<String>,
    /// Branch passed to `git push` (only used together with `remote`).
    pub branch: Option<String>,
    /// Version-control program, resolved through `PATH` when it is a bare name.
    pub git_program: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            stage_paths: vec![".".to_owned()],
            remote: None,
            branch: None,
            git_program: "git".to_owned(),
        }
    }
}

/// Daily quota bounds and the per-invocation act probability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Probability in `[0, 1]` that an invocation under quota acts.
    pub act_probability: f64,
    /// Smallest daily limit that can be drawn.
    pub limit_min: u32,
    /// Largest daily limit that can be drawn (inclusive).
    pub limit_max: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            act_probability: 0.65,
            limit_min: 3,
            limit_max: 12,
        }
    }
}

/// Ledger file location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// CSV ledger path.
    pub path: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: crate::streak_dirs::ledger_path(),
        }
    }
}

/// Which backend produces commit message text.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorBackend {
    /// OpenAI-compatible chat completions API (Ollama, vLLM, llama.cpp server...).
    #[default]
    Api,
    /// Local shell command that reads the prompt on stdin and prints text.
    Command,
    /// Pick from a fixed list of messages; no model involved.
    Static,
}

/// Commit message generator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Backend selection.
    pub backend: GeneratorBackend,
    /// Base URL for the API backend.
    pub api_url: String,
    /// Model name for the API backend.
    pub api_model: String,
    /// Inline API key (prefer `api_key_env`).
    pub api_key: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: Option<String>,
    /// Maximum new tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Nucleus sampling cutoff.
    pub top_p: f64,
    /// Shell command for the `command` backend.
    pub command: String,
    /// Candidate lines for the `static` backend.
    pub messages: Vec<String>,
    /// Few-shot prompt. Defaults to [`crate::generator::COMMIT_PROMPT`].
    pub prompt: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            backend: GeneratorBackend::Api,
            api_url: "http://localhost:11434".to_owned(),
            api_model: "qwen2.5:0.5b".to_owned(),
            api_key: None,
            api_key_env: None,
            max_tokens: 50,
            temperature: 0.9,
            top_p: 0.9,
            command: String::new(),
            messages: Vec::new(),
            prompt: None,
        }
    }
}

impl GeneratorConfig {
    /// Prompt to send, falling back to the built-in few-shot prompt.
    pub fn effective_prompt(&self) -> &str {
        self.prompt
            .as_deref()
            .unwrap_or(crate::generator::COMMIT_PROMPT)
    }

    /// Resolve the API key from `api_key_env` first, then `api_key`.
    pub fn resolve_api_key(&self) -> Result<Option<String>> {
        if let Some(var) = &self.api_key_env {
            let value = std::env::var(var).map_err(|_| {
                StreakError::Config(format!("generator api key env var is missing: {var}"))
            })?;
            if value.trim().is_empty() {
                return Err(StreakError::Config(format!(
                    "generator api key env var is empty: {var}"
                )));
            }
            return Ok(Some(value));
        }
        Ok(self.api_key.clone())
    }
}

/// Self-rescheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Lower bound of the random offset, in minutes.
    pub min_offset_minutes: u32,
    /// Upper bound of the random offset, in minutes (inclusive).
    pub max_offset_minutes: u32,
    /// Program used to read and load the periodic-task table.
    pub crontab_program: String,
    /// Substring identifying this program's line. Defaults to the executable path.
    pub marker: Option<String>,
    /// File the cron line appends stdout/stderr to.
    pub log_file: Option<PathBuf>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            min_offset_minutes: 15,
            max_offset_minutes: 45,
            crontab_program: "crontab".to_owned(),
            marker: None,
            log_file: None,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for daily-rolling log files (None = stderr only).
    pub dir: Option<PathBuf>,
    /// Default filter directive when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

impl StreakConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| StreakError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| StreakError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `config_dir()/config.toml`.
    pub fn default_config_path() -> PathBuf {
        crate::streak_dirs::config_dir().join("config.toml")
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`StreakError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let p = self.policy.act_probability;
        if !(0.0..=1.0).contains(&p) {
            return Err(StreakError::Config(format!(
                "policy.act_probability must be within [0, 1], got {p}"
            )));
        }
        if self.policy.limit_min == 0 || self.policy.limit_min > self.policy.limit_max {
            return Err(StreakError::Config(format!(
                "policy limits must satisfy 1 <= limit_min <= limit_max, got {}..={}",
                self.policy.limit_min, self.policy.limit_max
            )));
        }
        if self.schedule.min_offset_minutes > self.schedule.max_offset_minutes {
            return Err(StreakError::Config(format!(
                "schedule offsets must satisfy min <= max, got {}..={}",
                self.schedule.min_offset_minutes, self.schedule.max_offset_minutes
            )));
        }
        if self.repository.git_program.trim().is_empty() {
            return Err(StreakError::Config(
                "repository.git_program must not be empty".to_owned(),
            ));
        }
        if self.repository.stage_paths.is_empty() {
            return Err(StreakError::Config(
                "repository.stage_paths must not be empty".to_owned(),
            ));
        }
        match self.generator.backend {
            GeneratorBackend::Command if self.generator.command.trim().is_empty() => {
                return Err(StreakError::Config(
                    "generator.command is required for the command backend".to_owned(),
                ));
            }
            GeneratorBackend::Static if self.generator.messages.is_empty() => {
                return Err(StreakError::Config(
                    "generator.messages is required for the static backend".to_owned(),
                ));
            }
            _ => {}
        }
        Ok(())
    }

    /// Repository working directory, or an error when it was never configured.
    pub fn repository_path(&self) -> Result<&std::path::Path> {
        if self.repository.path.as_os_str().is_empty() {
            return Err(StreakError::Config(
                "repository.path is not set; point it at the repository to commit to".to_owned(),
            ));
        }
        Ok(&self.repository.path)
    }
}
