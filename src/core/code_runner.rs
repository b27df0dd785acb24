//! Execution seam for `/code`.
//!
//! Code runs as a child process with a timeout. There is no sandbox: the
//! snippet has the same privileges as NEXUS itself.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error, PartialEq)]
pub enum RunError {
    #[error("Unsupported language '{0}'. Supported: javascript, python")]
    UnsupportedLanguage(String),

    #[error("Failed to start {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("Execution timed out after {0:?}")]
    Timeout(Duration),
}

/// Captured result of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl RunOutput {
    /// Text shown to the user after a run.
    pub fn display(&self) -> String {
        let mut text = String::new();
        if !self.stdout.trim().is_empty() {
            text.push_str(self.stdout.trim_end());
        }
        if !self.stderr.trim().is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(self.stderr.trim_end());
        }
        if text.is_empty() {
            text.push_str("(no output)");
        }
        text
    }
}

#[async_trait]
pub trait CodeRunner: Send + Sync {
    async fn run(&self, language: &str, code: &str) -> Result<RunOutput, RunError>;
}

/// Interpreter and inline-code flag for a language name.
pub fn interpreter_for(language: &str) -> Option<(&'static str, &'static str)> {
    match language.trim().to_ascii_lowercase().as_str() {
        "js" | "javascript" | "node" => Some(("node", "-e")),
        "py" | "python" | "python3" => Some(("python3", "-c")),
        _ => None,
    }
}

/// Runs snippets through locally installed interpreters.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CodeRunner for ProcessRunner {
    async fn run(&self, language: &str, code: &str) -> Result<RunOutput, RunError> {
        let (program, flag) = interpreter_for(language)
            .ok_or_else(|| RunError::UnsupportedLanguage(language.to_string()))?;

        debug!(program, "running code snippet");
        let mut command = Command::new(program);
        command.arg(flag).arg(code).kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| RunError::Timeout(self.timeout))?
            .map_err(|e| RunError::Spawn {
                program: program.to_string(),
                message: e.to_string(),
            })?;

        Ok(RunOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpreter_aliases() {
        assert_eq!(interpreter_for("JavaScript"), Some(("node", "-e")));
        assert_eq!(interpreter_for("py"), Some(("python3", "-c")));
        assert_eq!(interpreter_for("ruby"), None);
    }

    #[tokio::test]
    async fn unsupported_language_is_rejected_without_spawning() {
        let runner = ProcessRunner::default();
        let err = runner.run("cobol", "DISPLAY 'HI'").await.unwrap_err();
        assert_eq!(err, RunError::UnsupportedLanguage("cobol".to_string()));
    }

    #[test]
    fn display_joins_streams() {
        let output = RunOutput {
            stdout: "42\n".to_string(),
            stderr: "warning\n".to_string(),
            success: true,
        };
        assert_eq!(output.display(), "42\nwarning");

        let empty = RunOutput {
            stdout: String::new(),
            stderr: String::new(),
            success: true,
        };
        assert_eq!(empty.display(), "(no output)");
    }
}
