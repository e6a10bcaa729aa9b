//! Process descriptions.

use crate::context::PipelineContext;
use crate::pipeline::LineStream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// How one of a child's standard streams is wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StdioMode {
    /// Connected to the pipeline (read or captured).
    #[default]
    Piped,
    /// Inherited from the current process.
    Inherit,
    /// Connected to the null device.
    Null,
}

impl From<StdioMode> for std::process::Stdio {
    fn from(mode: StdioMode) -> Self {
        match mode {
            StdioMode::Piped => Self::piped(),
            StdioMode::Inherit => Self::inherit(),
            StdioMode::Null => Self::null(),
        }
    }
}

/// Description of a command to run.
///
/// A spec is plain data: nothing runs until an executor spawns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSpec {
    /// Program name or path.
    pub program: String,
    /// Arguments, passed verbatim.
    #[serde(default)]
    pub args: Vec<String>,
    /// Stdin wiring when the pipeline provides no input.
    #[serde(default = "default_stdin")]
    pub stdin: StdioMode,
    /// Stdout wiring.
    #[serde(default)]
    pub stdout: StdioMode,
    /// Stderr wiring. `Piped` captures it for results and exit errors.
    #[serde(default)]
    pub stderr: StdioMode,
    /// Fail with a process exit error on non-zero exit.
    #[serde(default = "default_check_exit")]
    pub check_exit: bool,
    /// Working directory for the child.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_dir: Option<PathBuf>,
    /// Extra environment variables for the child.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<(String, String)>,
}

const fn default_stdin() -> StdioMode {
    StdioMode::Null
}

const fn default_check_exit() -> bool {
    true
}

impl ProcessSpec {
    /// Creates a spec for `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: default_stdin(),
            stdout: StdioMode::Piped,
            stderr: StdioMode::Piped,
            check_exit: true,
            current_dir: None,
            env: Vec::new(),
        }
    }

    /// Creates a spec that runs `script` with `sh -c`.
    #[must_use]
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("sh").arg("-c").arg(script)
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets stdout wiring.
    #[must_use]
    pub fn stdout(mut self, mode: StdioMode) -> Self {
        self.stdout = mode;
        self
    }

    /// Sets stderr wiring.
    #[must_use]
    pub fn stderr(mut self, mode: StdioMode) -> Self {
        self.stderr = mode;
        self
    }

    /// Sets stdin wiring for when no pipeline input is attached.
    #[must_use]
    pub fn stdin(mut self, mode: StdioMode) -> Self {
        self.stdin = mode;
        self
    }

    /// Disables exit-code checking for this process.
    #[must_use]
    pub fn no_check(mut self) -> Self {
        self.check_exit = false;
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Adds an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Spawns this process with the default context and streams its stdout as lines.
    #[must_use]
    pub fn line_stream(self) -> LineStream {
        LineStream::from_process(self)
    }

    /// Like [`line_stream`](Self::line_stream) but with an explicit context.
    #[must_use]
    pub fn line_stream_with(self, ctx: PipelineContext) -> LineStream {
        LineStream::from_process_with(ctx, self)
    }
}

impl fmt::Display for ProcessSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let spec = ProcessSpec::new("grep")
            .arg("-v")
            .args(["dummy", "file.txt"])
            .no_check()
            .env("LC_ALL", "C");

        assert_eq!(spec.args, vec!["-v", "dummy", "file.txt"]);
        assert!(!spec.check_exit);
        assert_eq!(spec.stdout, StdioMode::Piped);
        assert_eq!(spec.stdin, StdioMode::Null);
        assert_eq!(spec.to_string(), "grep -v dummy file.txt");
    }

    #[test]
    fn test_shell() {
        let spec = ProcessSpec::shell("echo hi | tr a-z A-Z");
        assert_eq!(spec.program, "sh");
        assert_eq!(spec.args, vec!["-c", "echo hi | tr a-z A-Z"]);
    }

    #[test]
    fn test_deserialize_defaults() {
        let spec: ProcessSpec =
            serde_json::from_value(serde_json::json!({"program": "cat"})).unwrap();
        assert_eq!(spec, ProcessSpec::new("cat"));
    }
}
