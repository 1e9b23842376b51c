//! Local-command backend: pipes the prompt to a shell command's stdin and
//! reads generated text from its stdout.

use super::MessageGenerator;
use crate::error::{Result, StreakError};
use std::io::Write;
use std::process::{Command, Stdio};

/// Generator backed by `/bin/sh -c <command>`.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    command: String,
}

impl CommandGenerator {
    /// Wrap `command`.
    ///
    /// # Errors
    ///
    /// Returns [`StreakError::Config`] if `command` is blank.
    pub fn new(command: &str) -> Result<Self> {
        if command.trim().is_empty() {
            return Err(StreakError::Config(
                "generator command is empty".to_owned(),
            ));
        }
        Ok(Self {
            command: command.to_owned(),
        })
    }
}

impl MessageGenerator for CommandGenerator {
    fn name(&self) -> &str {
        "command"
    }

    fn generate(&self, prompt: &str) -> Result<String> {
        let mut child = Command::new("/bin/sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| StreakError::Generator(format!("failed to run generator command: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A command that ignores stdin may close it early; that is not an error.
            if let Err(e) = stdin.write_all(prompt.as_bytes()) {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(StreakError::Generator(format!(
                        "failed to send prompt to generator command: {e}"
                    )));
                }
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| StreakError::Generator(format!("generator command failed: {e}")))?;

        if !output.status.success() {
            return Err(StreakError::Generator(format!(
                "generator command exited with status {}: {}",
                output
                    .status
                    .code()
                    .map_or_else(|| "unknown".to_owned(), |c| c.to_string()),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
