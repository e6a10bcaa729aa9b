//! Executor configuration.

use serde::{Deserialize, Serialize};

/// Configuration for [`TokioExecutor`](super::TokioExecutor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Size of each read from a child's stdout, in bytes.
    pub read_chunk_size: usize,
    /// Kill children whose handle is dropped before they exit.
    pub kill_on_drop: bool,
    /// Maximum number of stderr bytes kept per process. Extra output is read and discarded.
    pub stderr_capture_limit: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: 8 * 1024,
            kill_on_drop: true,
            stderr_capture_limit: 64 * 1024,
        }
    }
}

impl ExecutorConfig {
    /// Creates a new executor config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the stdout read chunk size. Zero is raised to one byte.
    #[must_use]
    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size.max(1);
        self
    }

    /// Sets whether dropped handles kill their child.
    #[must_use]
    pub fn with_kill_on_drop(mut self, kill: bool) -> Self {
        self.kill_on_drop = kill;
        self
    }

    /// Sets the stderr capture limit.
    #[must_use]
    pub fn with_stderr_capture_limit(mut self, limit: usize) -> Self {
        self.stderr_capture_limit = limit;
        self
    }
}
