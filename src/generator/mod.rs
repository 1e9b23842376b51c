//! Commit message generation.
//!
//! A [`MessageGenerator`] turns a few-shot prompt into free text; the commit
//! message is the text after the last `"- "` marker. Backends:
//! - [`ApiGenerator`]: OpenAI-compatible chat completions over HTTP
//! - [`CommandGenerator`]: a local command reading the prompt on stdin
//! - [`StaticGenerator`]: a fixed list of messages, no model involved

pub mod api;
pub mod command;

pub use api::ApiGenerator;
pub use command::CommandGenerator;

use crate::config::{GeneratorBackend, GeneratorConfig};
use crate::error::{Result, StreakError};
use rand::seq::SliceRandom;

/// Marker preceding each example (and the generated) commit message.
pub const MESSAGE_MARKER: &str = "- ";

/// Few-shot prompt describing the conventional-commit format.
pub const COMMIT_PROMPT: &str = "\
Generate a Git commit message following the Conventional Commits standard. \
The message should include a type, an optional scope, and a subject. \
Please keep it short. Here are some examples:

- feat(auth): add user authentication module
- fix(api): resolve null pointer exception in user endpoint
- docs(readme): update installation instructions
- chore(deps): upgrade lodash to version 4.17.21
- refactor(utils): simplify date formatting logic

Now, generate a new commit message:
";

/// Source of generated text.
pub trait MessageGenerator {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Produce free text for `prompt`.
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Pull the commit message out of generated text.
///
/// Takes everything after the last `"- "` and returns its first non-empty
/// line, trimmed.
///
/// # Errors
///
/// [`StreakError::GenerationFormat`] when the marker is missing or nothing
/// follows it.
pub fn extract_commit_message(text: &str) -> Result<String> {
    let message = text
        .rsplit_once(MESSAGE_MARKER)
        .and_then(|(_, rest)| rest.lines().map(str::trim).find(|line| !line.is_empty()));

    match message {
        Some(message) => Ok(message.to_owned()),
        None => Err(StreakError::GenerationFormat {
            text: text.to_owned(),
        }),
    }
}

/// Run `generator` on `prompt` and extract the commit message.
pub fn generate_message(generator: &dyn MessageGenerator, prompt: &str) -> Result<String> {
    let text = generator.generate(prompt)?;
    tracing::debug!(backend = generator.name(), "generated text: {text:?}");
    extract_commit_message(&text)
}

/// Build the configured backend.
pub fn from_config(config: &GeneratorConfig) -> Result<Box<dyn MessageGenerator>> {
    match config.backend {
        GeneratorBackend::Api => Ok(Box::new(ApiGenerator::new(config)?)),
        GeneratorBackend::Command => Ok(Box::new(CommandGenerator::new(&config.command)?)),
        GeneratorBackend::Static => Ok(Box::new(StaticGenerator::new(config.messages.clone())?)),
    }
}

/// Builds the configured backend on first use.
///
/// Quota and skip exits never generate, so a backend that cannot be built
/// (a missing API key variable, say) only fails runs that need a message.
#[derive(Debug, Clone)]
pub struct DeferredGenerator {
    config: GeneratorConfig,
}

impl DeferredGenerator {
    /// Defer building the backend described by `config`.
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }
}

impl MessageGenerator for DeferredGenerator {
    fn name(&self) -> &str {
        match self.config.backend {
            GeneratorBackend::Api => "api",
            GeneratorBackend::Command => "command",
            GeneratorBackend::Static => "static",
        }
    }

    fn generate(&self, prompt: &str) -> Result<String> {
        from_config(&self.config)?.generate(prompt)
    }
}

/// Picks one of a fixed set of messages at random.
#[derive(Debug, Clone)]
pub struct StaticGenerator {
    messages: Vec<String>,
}

impl StaticGenerator {
    /// Generator over `messages`. Each entry may or may not carry the `"- "` marker.
    pub fn new(messages: Vec<String>) -> Result<Self> {
        if messages.iter().all(|m| m.trim().is_empty()) {
            return Err(StreakError::Config(
                "static generator needs at least one non-empty message".to_owned(),
            ));
        }
        Ok(Self { messages })
    }
}

impl MessageGenerator for StaticGenerator {
    fn name(&self) -> &str {
        "static"
    }

    fn generate(&self, _prompt: &str) -> Result<String> {
        let candidates: Vec<&str> = self
            .messages
            .iter()
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .collect();
        let picked = candidates
            .choose(&mut rand::thread_rng())
            .ok_or_else(|| StreakError::Generator("no static messages configured".to_owned()))?;
        let picked = picked.strip_prefix(MESSAGE_MARKER).unwrap_or(picked);
        Ok(format!("{MESSAGE_MARKER}{picked}"))
    }
}
