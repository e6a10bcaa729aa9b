//! The xargs stage: one process per input line.

use super::guard::{cancellable, until_first_error};
use super::line_stream::LineStream;
use super::{spawn, ByteStream};
use crate::context::PipelineContext;
use crate::errors::{BoxError, LineflowResult};
use crate::events;
use crate::process::{ProcessResult, ProcessSpec, StdioMode};
use crate::stages::Applied;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use std::future::Future;
use std::path::Path;
use tracing::debug;

/// A sequence of process specs, one per input line, not yet run.
///
/// A fan-out is consumed through one of two views:
///
/// - **Collect** ([`results`](Self::results),
///   [`collect_results`](Self::collect_results)): every process runs to
///   completion, in input order, and its [`ProcessResult`] is returned.
/// - **Re-stream** ([`into_byte_stream`](Self::into_byte_stream),
///   [`into_line_stream`](Self::into_line_stream) and every delegating
///   [`LineStream`] operator): the processes' stdout is concatenated in
///   input order.
///
/// In both views process *i* has exited before process *i+1* is spawned.
pub struct FanOutStream {
    specs: BoxStream<'static, LineflowResult<ProcessSpec>>,
    ctx: PipelineContext,
}

impl FanOutStream {
    pub(crate) fn new(
        specs: BoxStream<'static, LineflowResult<ProcessSpec>>,
        ctx: PipelineContext,
    ) -> Self {
        Self { specs, ctx }
    }

    /// Returns the context the processes are spawned with.
    #[must_use]
    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Runs the processes one after another, yielding each result.
    ///
    /// A failed exit (unless disabled on the spec) ends the stream with a
    /// process exit error. No later process is spawned after any error.
    #[must_use]
    pub fn results(self) -> BoxStream<'static, LineflowResult<ProcessResult>> {
        let ctx = self.ctx.clone();
        let results = self
            .specs
            .enumerate()
            .map(|(index, spec)| spec.map(|spec| (index, spec)))
            .and_then(move |(index, spec)| {
                let ctx = ctx.clone();
                async move {
                    emit_item(&ctx, index, &spec);
                    spawn::run_to_completion(&ctx, &spec).await
                }
            })
            .boxed();
        cancellable(until_first_error(results), &self.ctx)
    }

    /// Runs the processes one after another and returns their results in
    /// input order.
    pub async fn collect_results(self) -> LineflowResult<Vec<ProcessResult>> {
        self.results().try_collect().await
    }

    /// Concatenates every process's stdout, in input order.
    ///
    /// Stdout is always piped in this view, whatever the spec asks for.
    /// The stream ends with the first error, so a failed process is the
    /// last one spawned.
    #[must_use]
    pub fn into_byte_stream(self) -> ByteStream {
        let ctx = self.ctx.clone();
        let bytes = self
            .specs
            .enumerate()
            .map(|(index, spec)| spec.map(|spec| (index, spec)))
            .map_ok(move |(index, spec)| {
                let spec = spec.stdout(StdioMode::Piped);
                emit_item(&ctx, index, &spec);
                spawn::spawn_output(ctx.clone(), spec, None)
            })
            .try_flatten()
            .boxed();
        cancellable(until_first_error(bytes), &self.ctx)
    }

    /// Concatenates every process's stdout and decodes it into lines.
    #[must_use]
    pub fn into_line_stream(self) -> LineStream {
        let ctx = self.ctx.clone();
        LineStream::from_bytes(self.into_byte_stream()).with_context(ctx)
    }

    /// Drains the combined output into text.
    pub async fn text(self) -> LineflowResult<String> {
        self.into_line_stream().text().await
    }

    /// Drains the combined output into a list of lines.
    pub async fn lines(self) -> LineflowResult<Vec<String>> {
        self.into_line_stream().lines().await
    }

    /// See [`LineStream::map`].
    #[must_use]
    pub fn map<F>(self, f: F) -> LineStream
    where
        F: FnMut(String) -> String + Send + 'static,
    {
        self.into_line_stream().map(f)
    }

    /// See [`LineStream::try_map`].
    #[must_use]
    pub fn try_map<F, E>(self, f: F) -> LineStream
    where
        F: FnMut(String) -> Result<String, E> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        self.into_line_stream().try_map(f)
    }

    /// See [`LineStream::then`].
    #[must_use]
    pub fn then<F, Fut, E>(self, f: F) -> LineStream
    where
        F: FnMut(String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<String, E>> + Send,
        E: Into<BoxError>,
    {
        self.into_line_stream().then(f)
    }

    /// See [`LineStream::filter`].
    #[must_use]
    pub fn filter<F>(self, predicate: F) -> LineStream
    where
        F: FnMut(&str) -> bool + Send + 'static,
    {
        self.into_line_stream().filter(predicate)
    }

    /// See [`LineStream::filter_async`].
    #[must_use]
    pub fn filter_async<F, Fut, E>(self, predicate: F) -> LineStream
    where
        F: FnMut(String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<bool, E>> + Send,
        E: Into<BoxError>,
    {
        self.into_line_stream().filter_async(predicate)
    }

    /// See [`LineStream::apply`].
    #[must_use]
    pub fn apply<F, R>(self, f: F) -> LineStream
    where
        F: FnMut(String) -> R + Send + 'static,
        R: Into<Applied<String>>,
    {
        self.into_line_stream().apply(f)
    }

    /// See [`LineStream::apply_async`].
    #[must_use]
    pub fn apply_async<F, Fut, R, E>(self, f: F) -> LineStream
    where
        F: FnMut(String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Into<Applied<String>> + 'static,
        E: Into<BoxError> + 'static,
    {
        self.into_line_stream().apply_async(f)
    }

    /// See [`LineStream::xargs`].
    #[must_use]
    pub fn xargs<F>(self, f: F) -> Self
    where
        F: FnMut(String) -> ProcessSpec + Send + 'static,
    {
        self.into_line_stream().xargs(f)
    }

    /// See [`LineStream::pipe`].
    #[must_use]
    pub fn pipe(self, spec: ProcessSpec) -> LineStream {
        self.into_line_stream().pipe(spec)
    }

    /// See [`LineStream::pipe_shell`].
    #[must_use]
    pub fn pipe_shell(self, script: impl Into<String>) -> LineStream {
        self.into_line_stream().pipe_shell(script)
    }

    /// See [`LineStream::for_each`].
    pub async fn for_each<F, Fut, R, E>(self, f: F) -> LineflowResult<Vec<R>>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        self.into_line_stream().for_each(f).await
    }

    /// See [`LineStream::to_file`].
    pub async fn to_file(self, path: impl AsRef<Path>) -> LineflowResult<()> {
        self.into_line_stream().to_file(path).await
    }

    /// See [`LineStream::append_to_file`].
    pub async fn append_to_file(self, path: impl AsRef<Path>) -> LineflowResult<()> {
        self.into_line_stream().append_to_file(path).await
    }
}

impl From<FanOutStream> for LineStream {
    fn from(fan_out: FanOutStream) -> Self {
        fan_out.into_line_stream()
    }
}

impl std::fmt::Debug for FanOutStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanOutStream").field("ctx", &self.ctx).finish_non_exhaustive()
    }
}

fn emit_item(ctx: &PipelineContext, index: usize, spec: &ProcessSpec) {
    debug!(index, command = %spec, "xargs item");
    ctx.events.try_emit(
        events::XARGS_ITEM,
        Some(serde_json::json!({
            "index": index,
            "program": spec.program,
        })),
    );
}
