//! Shared collaborators for a pipeline.

use crate::cancellation::CancellationToken;
use crate::events::{EventSink, NoOpEventSink};
use crate::process::{ProcessExecutor, TokioExecutor};
use std::sync::Arc;

/// The executor, event sink and cancellation token a pipeline runs with.
///
/// Every stream derived from a pipeline (stages, `pipe`, `xargs`) inherits
/// its context.
#[derive(Clone)]
pub struct PipelineContext {
    /// Starts processes.
    pub executor: Arc<dyn ProcessExecutor>,
    /// Receives process lifecycle events.
    pub events: Arc<dyn EventSink>,
    /// Optional cancellation signal.
    pub cancel: Option<Arc<CancellationToken>>,
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self {
            executor: Arc::new(TokioExecutor::default()),
            events: Arc::new(NoOpEventSink),
            cancel: None,
        }
    }
}

impl PipelineContext {
    /// Creates a context with the tokio executor and no event sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the executor.
    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn ProcessExecutor>) -> Self {
        self.executor = executor;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Sets the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Returns true if the context's token has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|token| token.is_cancelled())
    }
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("executor", &self.executor)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}
