//! Error types for streak.

/// Top-level error type for a contribution run.
#[derive(Debug, thiserror::Error)]
pub enum StreakError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Ledger file is unreadable or holds a malformed row.
    #[error("ledger error: {0}")]
    Ledger(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Generated text did not contain a `"- "` marker to extract a message from.
    #[error("unexpected generated text: {text:?}")]
    GenerationFormat {
        /// The raw text returned by the generator.
        text: String,
    },

    /// Text generator backend failed (transport, bad status, empty body).
    #[error("generator error: {0}")]
    Generator(String),

    /// Version-control tool could not be launched.
    #[error("version control error: {0}")]
    Vcs(String),

    /// Remote publish exited non-zero.
    #[error("push failed: {stderr}")]
    Publish {
        /// Captured standard error of the publish command.
        stderr: String,
    },

    /// Periodic-task table could not be read or installed.
    #[error("schedule error: {0}")]
    Schedule(String),

    /// Another run holds the run lock.
    #[error("lock error: {0}")]
    Lock(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, StreakError>;
