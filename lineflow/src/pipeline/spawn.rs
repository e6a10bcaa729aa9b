//! Glue between the executor contract and byte streams.

use super::ByteStream;
use crate::context::PipelineContext;
use crate::errors::{LineflowError, LineflowResult};
use crate::process::{ProcessHandle, ProcessResult, ProcessSpec};
use futures::future;
use futures::stream::{self, StreamExt, TryStreamExt};

/// Streams a running process's stdout, then waits for it.
///
/// The exit status is checked after the last chunk, so a failing process
/// still hands over everything it printed before the error is yielded.
pub(crate) fn process_output(
    mut handle: Box<dyn ProcessHandle>,
    check_exit: bool,
) -> ByteStream {
    let stdout = handle
        .take_stdout()
        .unwrap_or_else(|| stream::empty().boxed());

    let tail = stream::once(async move {
        handle.wait().await?.ensure_success(check_exit)?;
        Ok::<Option<Vec<u8>>, LineflowError>(None)
    });

    stdout
        .map_ok(Some)
        .chain(tail)
        .try_filter_map(future::ok)
        .boxed()
}

/// Lazily spawns `spec` on first pull and streams its stdout.
pub(crate) fn spawn_output(
    ctx: PipelineContext,
    spec: ProcessSpec,
    stdin: Option<ByteStream>,
) -> ByteStream {
    stream::once(async move {
        let handle = ctx.executor.spawn(&spec, stdin, ctx.events.clone())?;
        Ok::<_, LineflowError>(process_output(handle, spec.check_exit))
    })
    .try_flatten()
    .boxed()
}

/// Spawns `spec`, waits for it and checks its exit status.
pub(crate) async fn run_to_completion(
    ctx: &PipelineContext,
    spec: &ProcessSpec,
) -> LineflowResult<ProcessResult> {
    let handle = ctx.executor.spawn(spec, None, ctx.events.clone())?;
    handle.wait().await?.ensure_success(spec.check_exit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::codec;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_output_then_exit_error() {
        let spec = ProcessSpec::shell("echo partial; exit 4");
        let mut out = spawn_output(PipelineContext::new(), spec, None);

        assert_eq!(out.next().await.unwrap().unwrap(), b"partial\n".to_vec());
        let err = out.next().await.unwrap().unwrap_err();
        assert_eq!(err.exit_code(), Some(4));
        assert!(out.next().await.is_none());
    }

    #[tokio::test]
    async fn test_no_check_ignores_exit() {
        let spec = ProcessSpec::shell("echo ok; exit 1").no_check();
        let text = codec::collect_text(spawn_output(PipelineContext::new(), spec, None))
            .await
            .unwrap();
        assert_eq!(text, "ok\n");
    }

    #[tokio::test]
    async fn test_spawn_is_lazy() {
        let sink = std::sync::Arc::new(crate::events::CollectingEventSink::new());
        let ctx = PipelineContext::new().with_event_sink(sink.clone());

        let out = spawn_output(ctx, ProcessSpec::new("true"), None);
        assert!(sink.is_empty());

        let _ = codec::collect_text(out).await.unwrap();
        assert_eq!(sink.timeline(), vec!["process.spawned:true", "process.exited:true"]);
    }

    #[tokio::test]
    async fn test_run_to_completion_captures_stdout() {
        let result = run_to_completion(&PipelineContext::new(), &ProcessSpec::new("echo").arg("hi"))
            .await
            .unwrap();
        assert_eq!(result.stdout_text(), "hi\n");
        assert!(result.success());
    }
}
