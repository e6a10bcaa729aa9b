//! Error types for lineflow pipelines.
//!
//! Every failure that can end a pipeline is a variant of [`LineflowError`].
//! Errors are never retried or suppressed: the first one reaching a consumer
//! ends that consumer's call.

use thiserror::Error;

/// Boxed error accepted from user callbacks.
///
/// Anything convertible into this type (including `anyhow::Error`) can be
/// returned from a map, filter or apply callback.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type LineflowResult<T> = Result<T, LineflowError>;

/// The main error type for lineflow operations.
#[derive(Debug, Error)]
pub enum LineflowError {
    /// A stage callback failed or rejected.
    #[error("Transform failed in stage '{stage}': {source}")]
    Transform {
        /// The stage that failed.
        stage: String,
        /// The callback's error.
        #[source]
        source: BoxError,
    },

    /// A spawned process exited unsuccessfully while exit checking was on.
    #[error("Process '{program}' exited with {}{}", format_code(.code), format_stderr(.stderr))]
    ProcessExit {
        /// The program that was run.
        program: String,
        /// Exit code, `None` when the process was killed by a signal.
        code: Option<i32>,
        /// Captured standard error, if any.
        stderr: Option<String>,
    },

    /// A process could not be started.
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        /// The program that failed to start.
        program: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// File sink or pipe I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The pipeline was cancelled.
    #[error("Pipeline cancelled: {0}")]
    Cancelled(String),

    /// A spawned task panicked or was aborted.
    #[error("Task join error: {0}")]
    Join(String),

    /// Several independent invocations failed.
    #[error("{}", aggregate_summary(.0))]
    Aggregate(Vec<LineflowError>),
}

fn format_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| format!("code {c}"))
}

fn format_stderr(stderr: &Option<String>) -> String {
    match stderr.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => format!(": {s}"),
        _ => String::new(),
    }
}

fn aggregate_summary(errors: &[LineflowError]) -> String {
    let first = errors
        .first()
        .map_or_else(String::new, ToString::to_string);
    format!("{} invocations failed; first: {first}", errors.len())
}

impl LineflowError {
    /// Creates a transform error for the named stage.
    pub fn transform(stage: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Transform {
            stage: stage.into(),
            source: source.into(),
        }
    }

    /// Creates a process exit error.
    #[must_use]
    pub fn process_exit(
        program: impl Into<String>,
        code: Option<i32>,
        stderr: Option<String>,
    ) -> Self {
        Self::ProcessExit {
            program: program.into(),
            code,
            stderr,
        }
    }

    /// Creates a spawn error.
    #[must_use]
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    /// Creates a cancellation error.
    #[must_use]
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled(reason.into())
    }

    /// Returns true if this is a process exit failure.
    #[must_use]
    pub fn is_process_exit(&self) -> bool {
        matches!(self, Self::ProcessExit { .. })
    }

    /// Returns true if this is a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Returns the exit code carried by a process exit failure.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::ProcessExit { code, .. } => *code,
            _ => None,
        }
    }
}
