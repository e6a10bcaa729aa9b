//! In-memory process executor.

use crate::errors::{LineflowError, LineflowResult};
use crate::events::{self, EventSink};
use crate::pipeline::{codec, ByteStream};
use crate::process::{ProcessExecutor, ProcessHandle, ProcessResult, ProcessSpec, StdioMode};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::{self, ErrorKind};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

type Script = Arc<dyn Fn(&ProcessSpec) -> ScriptedProcess + Send + Sync>;

/// What a scripted process does once spawned.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProcess {
    stdout: Vec<u8>,
    stderr: String,
    code: i32,
    delay: Option<Duration>,
    echo_stdin: bool,
}

impl ScriptedProcess {
    /// Exits 0 after printing `stdout`.
    #[must_use]
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into().into_bytes(),
            ..Self::default()
        }
    }

    /// Exits with `code` after printing `stderr`.
    #[must_use]
    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stderr: stderr.into(),
            code,
            ..Self::default()
        }
    }

    /// Copies stdin to stdout, like `cat`.
    #[must_use]
    pub fn echo_stdin() -> Self {
        Self {
            echo_stdin: true,
            ..Self::default()
        }
    }

    /// Waits `delay` before producing output.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sets the exit code.
    #[must_use]
    pub fn with_code(mut self, code: i32) -> Self {
        self.code = code;
        self
    }

    /// Sets the stderr text.
    #[must_use]
    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }
}

/// An executor that runs scripted behaviours instead of real programs.
///
/// Every spawn and exit is appended to a timeline (`"spawn <command>"`,
/// `"exit <command>"`) so tests can assert on process ordering.
#[derive(Default)]
pub struct ScriptedExecutor {
    scripts: HashMap<String, Script>,
    timeline: Arc<Mutex<Vec<String>>>,
    next_pid: AtomicU32,
}

impl ScriptedExecutor {
    /// Creates an executor that knows no programs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an executor with `echo`, `cat`, `true` and `false`.
    #[must_use]
    pub fn with_coreutils() -> Self {
        Self::new()
            .script("echo", |spec: &ProcessSpec| {
                ScriptedProcess::success(format!("{}\n", spec.args.join(" ")))
            })
            .script("cat", |_: &ProcessSpec| ScriptedProcess::echo_stdin())
            .script("true", |_: &ProcessSpec| ScriptedProcess::default())
            .script("false", |_: &ProcessSpec| ScriptedProcess::failure(1, ""))
    }

    /// Registers the behaviour of `program`.
    #[must_use]
    pub fn script<F>(mut self, program: impl Into<String>, behaviour: F) -> Self
    where
        F: Fn(&ProcessSpec) -> ScriptedProcess + Send + Sync + 'static,
    {
        self.scripts.insert(program.into(), Arc::new(behaviour));
        self
    }

    /// Returns the spawn/exit timeline.
    #[must_use]
    pub fn timeline(&self) -> Vec<String> {
        self.timeline.lock().clone()
    }

    /// Returns how many processes were spawned.
    #[must_use]
    pub fn spawn_count(&self) -> usize {
        self.timeline
            .lock()
            .iter()
            .filter(|entry| entry.starts_with("spawn "))
            .count()
    }
}

impl std::fmt::Debug for ScriptedExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut programs: Vec<_> = self.scripts.keys().collect();
        programs.sort();
        f.debug_struct("ScriptedExecutor")
            .field("programs", &programs)
            .finish_non_exhaustive()
    }
}

fn delayed(inner: ByteStream, delay: Option<Duration>) -> ByteStream {
    match delay {
        Some(delay) => stream::once(async move {
            tokio::time::sleep(delay).await;
            inner
        })
        .flatten()
        .boxed(),
        None => inner,
    }
}

impl ProcessExecutor for ScriptedExecutor {
    fn spawn(
        &self,
        spec: &ProcessSpec,
        stdin: Option<ByteStream>,
        events: Arc<dyn EventSink>,
    ) -> LineflowResult<Box<dyn ProcessHandle>> {
        let Some(script) = self.scripts.get(&spec.program) else {
            events.try_emit(
                events::PROCESS_SPAWN_FAILED,
                Some(serde_json::json!({ "program": spec.program })),
            );
            return Err(LineflowError::spawn(
                &spec.program,
                io::Error::new(ErrorKind::NotFound, "no script registered"),
            ));
        };
        let behaviour = script(spec);
        let pid = self.next_pid.fetch_add(1, Ordering::Relaxed) + 1;

        self.timeline.lock().push(format!("spawn {spec}"));
        events.try_emit(
            events::PROCESS_SPAWNED,
            Some(serde_json::json!({
                "program": spec.program,
                "args": spec.args,
                "pid": pid,
            })),
        );

        let mut unread = Vec::new();
        let body = if behaviour.echo_stdin {
            stdin.unwrap_or_else(|| stream::empty().boxed())
        } else {
            unread.extend(stdin);
            stream::iter(vec![Ok(behaviour.stdout)]).boxed()
        };
        let body = delayed(body, behaviour.delay);
        let stdout = if spec.stdout == StdioMode::Piped {
            Some(body)
        } else {
            unread.push(body);
            None
        };

        Ok(Box::new(ScriptedHandle {
            command: spec.to_string(),
            program: spec.program.clone(),
            pid,
            stdout,
            unread,
            stderr: (spec.stderr == StdioMode::Piped).then_some(behaviour.stderr),
            code: behaviour.code,
            timeline: self.timeline.clone(),
            events,
        }))
    }
}

struct ScriptedHandle {
    command: String,
    program: String,
    pid: u32,
    stdout: Option<ByteStream>,
    /// Streams nobody reads but that must still be drained (stdin, unpiped stdout).
    unread: Vec<ByteStream>,
    stderr: Option<String>,
    code: i32,
    timeline: Arc<Mutex<Vec<String>>>,
    events: Arc<dyn EventSink>,
}

#[async_trait]
impl ProcessHandle for ScriptedHandle {
    fn program(&self) -> &str {
        &self.program
    }

    fn id(&self) -> Option<u32> {
        Some(self.pid)
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
        let mut drain_result = Ok(());
        for stream in this.unread.drain(..) {
            if let Err(e) = codec::collect_text(stream).await {
                drain_result = Err(e);
                break;
            }
        }

        this.timeline.lock().push(format!("exit {}", this.command));
        this.events.try_emit(
            events::PROCESS_EXITED,
            Some(serde_json::json!({
                "program": this.program,
                "pid": this.pid,
                "code": this.code,
            })),
        );

        drain_result?;
        Ok(ProcessResult {
            program: this.program,
            code: Some(this.code),
            stdout,
            stderr: this.stderr,
        })
    }
}
