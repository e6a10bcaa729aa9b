//! The line pipeline.

use super::fan_out::FanOutStream;
use super::guard::cancellable;
use super::{codec, file, spawn, ByteStream, LineResultStream};
use crate::cancellation::CancellationToken;
use crate::context::PipelineContext;
use crate::errors::{BoxError, LineflowError, LineflowResult};
use crate::events::EventSink;
use crate::helpers::task::AbortOnDrop;
use crate::process::{ProcessExecutor, ProcessSpec};
use crate::stages::{run_stage, Applied, Apply, Filter, Map, RawMap, Stage};
use futures::future;
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use std::convert::Infallible;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::debug;

/// A lazy, single-consumer sequence of text lines.
///
/// Nothing runs until the stream is polled: processes are spawned and files
/// opened on the first pull. Every operator takes `self` by value, so a
/// stream that has been piped, staged or consumed cannot be used again.
///
/// # Example
///
/// ```no_run
/// use lineflow::prelude::*;
///
/// # async fn demo() -> LineflowResult<()> {
/// let text = LineStream::from_lines(["olleh", "nop", "dlrow"])
///     .apply(|l| (l != "nop").then(|| l.chars().rev().collect::<String>()))
///     .xargs(|l| ProcessSpec::new("echo").arg(format!("{l}!")))
///     .text()
///     .await?;
/// assert_eq!(text, "hello!\nworld!\n");
/// # Ok(())
/// # }
/// ```
pub struct LineStream {
    inner: LineResultStream,
    ctx: PipelineContext,
}

impl LineStream {
    /// Wraps an arbitrary stream of lines.
    pub fn new<S>(lines: S) -> Self
    where
        S: Stream<Item = LineflowResult<String>> + Send + 'static,
    {
        Self {
            inner: lines.boxed(),
            ctx: PipelineContext::default(),
        }
    }

    /// Wraps an in-memory list of lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let owned: Vec<LineflowResult<String>> = lines.into_iter().map(|l| Ok(l.into())).collect();
        Self::new(stream::iter(owned))
    }

    /// Decodes a byte stream into lines.
    #[must_use]
    pub fn from_bytes(bytes: ByteStream) -> Self {
        Self::new(codec::decode_lines(bytes))
    }

    /// Spawns `spec` with the default context and streams its stdout.
    #[must_use]
    pub fn from_process(spec: ProcessSpec) -> Self {
        Self::from_process_with(PipelineContext::default(), spec)
    }

    /// Spawns `spec` through `ctx` and streams its stdout.
    ///
    /// The process starts on the first pull. A non-zero exit (unless
    /// disabled on the spec) ends the stream with a process exit error after
    /// all of its output.
    #[must_use]
    pub fn from_process_with(ctx: PipelineContext, spec: ProcessSpec) -> Self {
        let bytes = spawn::spawn_output(ctx.clone(), spec, None);
        Self::derived(codec::decode_lines(bytes), ctx)
    }

    /// Streams the lines of a file. The file is opened on the first pull.
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        Self::from_bytes(file::file_stream(path.as_ref().to_path_buf()))
    }

    fn derived(inner: LineResultStream, ctx: PipelineContext) -> Self {
        Self {
            inner: cancellable(inner, &ctx),
            ctx,
        }
    }

    /// Replaces the context used by this stream and everything derived from it.
    #[must_use]
    pub fn with_context(self, ctx: PipelineContext) -> Self {
        Self::derived(self.inner, ctx)
    }

    /// Sets the executor used by `pipe` and `xargs`.
    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn ProcessExecutor>) -> Self {
        self.ctx = self.ctx.with_executor(executor);
        self
    }

    /// Sets the sink receiving lifecycle events of downstream processes.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.ctx = self.ctx.with_event_sink(events);
        self
    }

    /// Ends this stream (and anything derived from it) when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(self, token: Arc<CancellationToken>) -> Self {
        let ctx = self.ctx.clone().with_cancellation(token);
        self.with_context(ctx)
    }

    /// Returns the context this stream runs with.
    #[must_use]
    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Appends a stage.
    #[must_use]
    pub fn stage<S>(self, stage: S) -> Self
    where
        S: Stage<String, Output = String>,
    {
        Self::derived(run_stage(self.inner, stage), self.ctx)
    }

    /// Transforms every line with an infallible, synchronous function.
    #[must_use]
    pub fn map<F>(self, f: F) -> Self
    where
        F: FnMut(String) -> String + Send + 'static,
    {
        self.stage(RawMap::new("map", f))
    }

    /// Transforms every line with a fallible, synchronous function.
    #[must_use]
    pub fn try_map<F, E>(self, mut f: F) -> Self
    where
        F: FnMut(String) -> Result<String, E> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        self.stage(Map::new("try_map", move |line: String| future::ready(f(line))))
    }

    /// Transforms every line with an async function, one line at a time.
    #[must_use]
    pub fn then<F, Fut, E>(self, f: F) -> Self
    where
        F: FnMut(String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<String, E>> + Send,
        E: Into<BoxError>,
    {
        self.stage(Map::new("then", f))
    }

    /// Keeps the lines for which `predicate` returns true.
    #[must_use]
    pub fn filter<F>(self, mut predicate: F) -> Self
    where
        F: FnMut(&str) -> bool + Send + 'static,
    {
        self.stage(Filter::new("filter", move |line: String| {
            future::ready(Ok::<_, Infallible>(predicate(&line)))
        }))
    }

    /// Keeps the lines for which the async `predicate` resolves to true.
    #[must_use]
    pub fn filter_async<F, Fut, E>(self, predicate: F) -> Self
    where
        F: FnMut(String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<bool, E>> + Send,
        E: Into<BoxError>,
    {
        self.stage(Filter::new("filter_async", predicate))
    }

    /// Filter-map: `f` returns nothing, one line or several lines per input.
    ///
    /// `Option<String>`, `Vec<String>` and [`Applied`] are all accepted.
    #[must_use]
    pub fn apply<F, R>(self, mut f: F) -> Self
    where
        F: FnMut(String) -> R + Send + 'static,
        R: Into<Applied<String>>,
    {
        self.stage(Apply::new("apply", move |line: String| {
            let applied: Applied<String> = f(line).into();
            future::ready(Ok::<_, Infallible>(applied))
        }))
    }

    /// Async form of [`apply`](Self::apply).
    #[must_use]
    pub fn apply_async<F, Fut, R, E>(self, mut f: F) -> Self
    where
        F: FnMut(String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Into<Applied<String>> + 'static,
        E: Into<BoxError> + 'static,
    {
        self.stage(Apply::new("apply_async", move |line: String| {
            let fut = f(line);
            async move { fut.await.map(Into::<Applied<String>>::into) }
        }))
    }

    /// Drains the stream into a list of lines.
    pub async fn lines(self) -> LineflowResult<Vec<String>> {
        self.inner.try_collect().await
    }

    /// Drains the stream into text, each line followed by `\n`.
    pub async fn text(self) -> LineflowResult<String> {
        self.inner
            .try_fold(String::new(), |mut acc, line| async move {
                acc.push_str(&line);
                acc.push('\n');
                Ok(acc)
            })
            .await
    }

    /// Re-encodes the lines as bytes, each followed by `\n`.
    #[must_use]
    pub fn into_byte_stream(self) -> ByteStream {
        codec::encode_lines(self.inner)
    }

    /// Feeds this stream into `spec`'s stdin and streams its stdout.
    ///
    /// The process is spawned on the first pull of the returned stream. If
    /// this stream fails while feeding, the error is reported after the
    /// child's output has been read.
    #[must_use]
    pub fn pipe(self, spec: ProcessSpec) -> Self {
        let ctx = self.ctx;
        debug!(command = %spec, "Piping line stream into process");
        let input = codec::encode_lines(self.inner);
        let bytes = spawn::spawn_output(ctx.clone(), spec, Some(input));
        Self::derived(codec::decode_lines(bytes), ctx)
    }

    /// Shorthand for `pipe(ProcessSpec::shell(script))`.
    #[must_use]
    pub fn pipe_shell(self, script: impl Into<String>) -> Self {
        self.pipe(ProcessSpec::shell(script))
    }

    /// Runs one process per line.
    ///
    /// Each spec is built as its line arrives; processes run strictly one
    /// after another.
    #[must_use]
    pub fn xargs<F>(self, f: F) -> FanOutStream
    where
        F: FnMut(String) -> ProcessSpec + Send + 'static,
    {
        FanOutStream::new(self.inner.map_ok(f).boxed(), self.ctx)
    }

    /// Starts `f` for every line as soon as it is read, with no concurrency
    /// limit, then awaits all of them and returns their results in input order.
    ///
    /// The first failure in input order is returned and the remaining tasks
    /// are aborted.
    pub async fn for_each<F, Fut, R, E>(self, mut f: F) -> LineflowResult<Vec<R>>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        let mut lines = self.inner;
        let mut tasks = Vec::new();
        while let Some(line) = lines.next().await {
            tasks.push(AbortOnDrop::spawn(f(line?)));
        }
        debug!(tasks = tasks.len(), "Launched for_each tasks");

        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            let value = task
                .join()
                .await?
                .map_err(|e| LineflowError::transform("for_each", e))?;
            results.push(value);
        }
        Ok(results)
    }

    /// Writes the lines to `path`, creating or truncating it.
    pub async fn to_file(self, path: impl AsRef<Path>) -> LineflowResult<()> {
        file::write_stream(self.into_byte_stream(), path.as_ref(), false).await
    }

    /// Appends the lines to `path`, creating it if missing.
    pub async fn append_to_file(self, path: impl AsRef<Path>) -> LineflowResult<()> {
        file::write_stream(self.into_byte_stream(), path.as_ref(), true).await
    }
}

impl Stream for LineStream {
    type Item = LineflowResult<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl std::fmt::Debug for LineStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineStream").field("ctx", &self.ctx).finish_non_exhaustive()
    }
}
