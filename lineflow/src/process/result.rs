//! Completed process results.

use crate::errors::{LineflowError, LineflowResult};
use serde::{Deserialize, Serialize};

/// The outcome of a process that has terminated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessResult {
    /// The program that ran.
    pub program: String,
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
    /// Captured stdout, when stdout was piped and not streamed elsewhere.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    /// Captured stderr, when stderr was piped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

impl ProcessResult {
    /// Creates a result with no captured output.
    #[must_use]
    pub fn new(program: impl Into<String>, code: Option<i32>) -> Self {
        Self {
            program: program.into(),
            code,
            stdout: None,
            stderr: None,
        }
    }

    /// Returns true if the process exited with code zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Returns the captured stdout, or an empty string.
    #[must_use]
    pub fn stdout_text(&self) -> &str {
        self.stdout.as_deref().unwrap_or_default()
    }

    /// Turns a failed exit into a process exit error when `check_exit` is set.
    pub fn ensure_success(self, check_exit: bool) -> LineflowResult<Self> {
        if check_exit && !self.success() {
            return Err(LineflowError::process_exit(self.program, self.code, self.stderr));
        }
        Ok(self)
    }
}
