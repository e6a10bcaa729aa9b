//! Executor and handle traits.

use super::{ProcessResult, ProcessSpec};
use crate::errors::LineflowResult;
use crate::events::EventSink;
use crate::pipeline::ByteStream;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// Starts processes described by a [`ProcessSpec`].
pub trait ProcessExecutor: Send + Sync + Debug {
    /// Spawns `spec`.
    ///
    /// When `stdin` is given it is fed to the child's standard input and the
    /// child sees EOF once the stream ends. Lifecycle events go to `events`.
    fn spawn(
        &self,
        spec: &ProcessSpec,
        stdin: Option<ByteStream>,
        events: Arc<dyn EventSink>,
    ) -> LineflowResult<Box<dyn ProcessHandle>>;
}

/// A running process.
///
/// Dropping a handle before `wait` completes releases the process; the
/// default executor kills it.
#[async_trait]
pub trait ProcessHandle: Send {
    /// The program this handle runs.
    fn program(&self) -> &str;

    /// OS process id, when known.
    fn id(&self) -> Option<u32>;

    /// Takes the stdout byte stream. Returns `None` if stdout was not piped
    /// or has already been taken.
    fn take_stdout(&mut self) -> Option<ByteStream>;

    /// Waits for the process to terminate.
    ///
    /// Piped stdout that was never taken is captured into the result. An
    /// error from the stdin source is returned here, after the child exits.
    /// The exit status is not checked.
    async fn wait(self: Box<Self>) -> LineflowResult<ProcessResult>;
}
