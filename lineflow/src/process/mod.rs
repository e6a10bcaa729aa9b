//! The process-executor boundary.
//!
//! The pipeline core never touches `tokio::process` directly. It describes a
//! command with a [`ProcessSpec`], asks a [`ProcessExecutor`] to start it, and
//! talks to the running process through a [`ProcessHandle`].

mod config;
mod executor;
mod result;
mod spec;
mod tokio_executor;

pub use config::ExecutorConfig;
pub use executor::{ProcessExecutor, ProcessHandle};
pub use result::ProcessResult;
pub use spec::{ProcessSpec, StdioMode};
pub use tokio_executor::TokioExecutor;
