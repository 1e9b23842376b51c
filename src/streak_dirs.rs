//! Centralized directory paths for streak.
//!
//! Uses the [`dirs`] crate for platform-appropriate resolution.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | Data (ledger, lock) | `~/Library/Application Support/streak/` | `~/.local/share/streak/` |
//! | Config | `~/Library/Application Support/streak/` | `~/.config/streak/` |
//!
//! # Environment Overrides
//!
//! - `STREAK_DATA_DIR` overrides [`data_dir`]
//! - `STREAK_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

/// Application data root directory.
///
/// Holds the contribution ledger and its run lock.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("STREAK_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("streak"))
        .unwrap_or_else(|| PathBuf::from("/tmp/streak-data"))
}

/// Application config directory.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("STREAK_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("streak"))
        .unwrap_or_else(|| PathBuf::from("/tmp/streak-config"))
}

/// Default ledger file (`data_dir()/contributions.csv`).
#[must_use]
pub fn ledger_path() -> PathBuf {
    data_dir().join("contributions.csv")
}
