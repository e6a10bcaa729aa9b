//! # Lineflow
//!
//! Line-oriented pipelines over external processes.
//!
//! Lineflow lets you spawn a process, read its stdout as a lazy sequence of
//! lines, transform those lines, feed them into further processes, or fan
//! them out into one process per line:
//!
//! - **Stages**: map, filter and apply steps that run strictly in order, one
//!   line at a time
//! - **Line streams**: single-consumer, pull-based pipelines with terminal
//!   consumers (text, lines, files, concurrent `for_each`)
//! - **xargs**: one process per line, consumed as ordered results or as one
//!   concatenated output stream
//! - **Bounded fan-out**: a concurrency-capped helper for side-effecting work
//! - **Cancellation**: a token that ends a pipeline and kills its processes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lineflow::prelude::*;
//!
//! # async fn demo() -> LineflowResult<()> {
//! let words = ProcessSpec::shell("printf 'b\\na\\nc\\n'")
//!     .line_stream()
//!     .pipe(ProcessSpec::new("sort"))
//!     .map(|l| l.to_uppercase())
//!     .lines()
//!     .await?;
//! assert_eq!(words, vec!["A", "B", "C"]);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod context;
pub mod errors;
pub mod events;
pub mod helpers;
pub mod observability;
pub mod pipeline;
pub mod process;
pub mod stages;
pub mod testing;

pub use errors::{LineflowError, LineflowResult};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::context::PipelineContext;
    pub use crate::errors::{BoxError, LineflowError, LineflowResult};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::helpers::{nproc, split, xargs, xargs_iter};
    pub use crate::pipeline::{FanOutStream, LineStream};
    pub use crate::process::{
        ExecutorConfig, ProcessExecutor, ProcessResult, ProcessSpec, StdioMode, TokioExecutor,
    };
    pub use crate::stages::{Applied, Stage};
}
