//! Default executor backed by `tokio::process`.

use super::{ExecutorConfig, ProcessExecutor, ProcessHandle, ProcessResult, ProcessSpec, StdioMode};
use crate::errors::{LineflowError, LineflowResult};
use crate::events::{self, EventSink};
use crate::helpers::task::AbortOnDrop;
use crate::observability::SpanTimer;
use crate::pipeline::{codec, ByteStream};
use async_trait::async_trait;
use futures::StreamExt;
use std::io::ErrorKind;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tracing::{debug, warn};

/// Spawns real OS processes.
#[derive(Debug, Clone, Default)]
pub struct TokioExecutor {
    config: ExecutorConfig,
}

impl TokioExecutor {
    /// Creates an executor with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an executor with the given configuration.
    #[must_use]
    pub fn with_config(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    fn command(&self, spec: &ProcessSpec, has_input: bool) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .kill_on_drop(self.config.kill_on_drop)
            .stdout(spec.stdout)
            .stderr(spec.stderr);

        if has_input {
            cmd.stdin(StdioMode::Piped);
        } else {
            cmd.stdin(spec.stdin);
        }
        if let Some(ref dir) = spec.current_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }
        cmd
    }
}

impl ProcessExecutor for TokioExecutor {
    fn spawn(
        &self,
        spec: &ProcessSpec,
        stdin: Option<ByteStream>,
        events: Arc<dyn EventSink>,
    ) -> LineflowResult<Box<dyn ProcessHandle>> {
        let mut child = match self.command(spec, stdin.is_some()).spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(program = %spec.program, error = %e, "Failed to spawn process");
                events.try_emit(
                    events::PROCESS_SPAWN_FAILED,
                    Some(serde_json::json!({
                        "program": spec.program,
                        "error": e.to_string(),
                    })),
                );
                return Err(LineflowError::spawn(&spec.program, e));
            }
        };

        let pid = child.id();
        debug!(program = %spec.program, pid = ?pid, command = %spec, "Spawned process");
        events.try_emit(
            events::PROCESS_SPAWNED,
            Some(serde_json::json!({
                "program": spec.program,
                "args": spec.args,
                "pid": pid,
            })),
        );

        let feeder = match (stdin, child.stdin.take()) {
            (Some(input), Some(sink)) => Some(AbortOnDrop::spawn(feed_stdin(input, sink))),
            _ => None,
        };
        let stderr = child
            .stderr
            .take()
            .map(|err| AbortOnDrop::spawn(read_capped(err, self.config.stderr_capture_limit)));
        let stdout = child
            .stdout
            .take()
            .map(|out| codec::reader_stream(out, self.config.read_chunk_size));

        Ok(Box::new(TokioProcess {
            program: spec.program.clone(),
            pid,
            child,
            stdout,
            feeder,
            stderr,
            events,
            timer: SpanTimer::start(spec.program.clone()),
        }))
    }
}

/// Copies the pipeline's bytes into a child's stdin, closing it at the end.
async fn feed_stdin(mut input: ByteStream, mut sink: ChildStdin) -> LineflowResult<()> {
    while let Some(chunk) = input.next().await {
        let chunk = chunk?;
        if let Err(e) = sink.write_all(&chunk).await {
            // The child stopped reading (e.g. `head`); the rest of the input is not needed.
            if e.kind() == ErrorKind::BrokenPipe {
                debug!("Child closed stdin early");
                return Ok(());
            }
            return Err(e.into());
        }
    }
    match sink.shutdown().await {
        Err(e) if e.kind() != ErrorKind::BrokenPipe => Err(e.into()),
        _ => Ok(()),
    }
}

/// Reads `reader` to EOF, keeping at most `limit` bytes.
async fn read_capped<R>(mut reader: R, limit: usize) -> LineflowResult<String>
where
    R: AsyncRead + Unpin,
{
    let mut kept = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        let room = limit.saturating_sub(kept.len());
        kept.extend_from_slice(&buf[..n.min(room)]);
    }
    Ok(String::from_utf8_lossy(&kept).into_owned())
}

struct TokioProcess {
    program: String,
    pid: Option<u32>,
    child: Child,
    stdout: Option<ByteStream>,
    feeder: Option<AbortOnDrop<LineflowResult<()>>>,
    stderr: Option<AbortOnDrop<LineflowResult<String>>>,
    events: Arc<dyn EventSink>,
    timer: SpanTimer,
}

#[async_trait]
impl ProcessHandle for TokioProcess {
    fn program(&self) -> &str {
        &self.program
    }

    fn id(&self) -> Option<u32> {
        self.pid
    }

    fn take_stdout(&mut self) -> Option<ByteStream> {
        self.stdout.take()
    }

    async fn wait(self: Box<Self>) -> LineflowResult<ProcessResult> {
        let mut this = *self;

        let stdout = match this.stdout.take() {
            Some(stream) => Some(codec::collect_text(stream).await?),
            None => None,
        };
        let feed_result = match this.feeder.take() {
            Some(feeder) => feeder.join().await?,
            None => Ok(()),
        };
        let status = this.child.wait().await?;
        let stderr = match this.stderr.take() {
            Some(task) => Some(task.join().await??),
            None => None,
        };

        let duration_ms = this.timer.finish();
        debug!(
            program = %this.program,
            pid = ?this.pid,
            code = ?status.code(),
            duration_ms,
            "Process exited"
        );
        this.events.try_emit(
            events::PROCESS_EXITED,
            Some(serde_json::json!({
                "program": this.program,
                "pid": this.pid,
                "code": status.code(),
                "duration_ms": duration_ms,
            })),
        );

        feed_result?;
        Ok(ProcessResult {
            program: this.program,
            code: status.code(),
            stdout,
            stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{CollectingEventSink, NoOpEventSink};
    use futures::stream;

    fn noop() -> Arc<dyn EventSink> {
        Arc::new(NoOpEventSink)
    }

    #[tokio::test]
    async fn test_wait_captures_stdout_and_stderr() {
        let spec = ProcessSpec::shell("echo out; echo err >&2; exit 3");
        let handle = TokioExecutor::new().spawn(&spec, None, noop()).unwrap();

        let result = handle.wait().await.unwrap();
        assert_eq!(result.code, Some(3));
        assert_eq!(result.stdout.as_deref(), Some("out\n"));
        assert_eq!(result.stderr.as_deref(), Some("err\n"));
    }

    #[tokio::test]
    async fn test_stdin_is_fed_and_closed() {
        let input: ByteStream =
            stream::iter(vec![Ok(b"a\n".to_vec()), Ok(b"b\n".to_vec())]).boxed();
        let handle = TokioExecutor::new()
            .spawn(&ProcessSpec::new("cat"), Some(input), noop())
            .unwrap();

        let result = handle.wait().await.unwrap();
        assert_eq!(result.stdout_text(), "a\nb\n");
    }

    #[tokio::test]
    async fn test_stdin_error_surfaces_from_wait() {
        let input: ByteStream = stream::iter(vec![
            Ok(b"a\n".to_vec()),
            Err(LineflowError::cancelled("upstream broke")),
        ])
        .boxed();
        let handle = TokioExecutor::new()
            .spawn(&ProcessSpec::new("cat"), Some(input), noop())
            .unwrap();

        let err = handle.wait().await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let sink = Arc::new(CollectingEventSink::new());
        let err = TokioExecutor::new()
            .spawn(&ProcessSpec::new("definitely-not-a-real-binary-xyz"), None, sink.clone())
            .err()
            .unwrap();

        assert!(matches!(err, LineflowError::Spawn { .. }));
        assert_eq!(sink.events_of_type(events::PROCESS_SPAWN_FAILED).len(), 1);
    }

    #[tokio::test]
    async fn test_lifecycle_events() {
        let sink = Arc::new(CollectingEventSink::new());
        let handle = TokioExecutor::new()
            .spawn(&ProcessSpec::new("true"), None, sink.clone())
            .unwrap();
        assert!(handle.id().is_some());
        handle.wait().await.unwrap();

        assert_eq!(sink.timeline(), vec!["process.spawned:true", "process.exited:true"]);
    }

    #[tokio::test]
    async fn test_stderr_capture_limit() {
        let config = ExecutorConfig::new().with_stderr_capture_limit(3);
        let executor = TokioExecutor::with_config(config);
        let handle = executor
            .spawn(&ProcessSpec::shell("echo abcdef >&2"), None, noop())
            .unwrap();

        assert_eq!(handle.wait().await.unwrap().stderr.as_deref(), Some("abc"));
    }
}
