//! Event sink system for process lifecycle observability.
//!
//! Executors report every spawn and exit to an [`EventSink`]; fan-out
//! stages report per-line progress. The default sink discards everything.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// A process was started.
pub const PROCESS_SPAWNED: &str = "process.spawned";
/// A process terminated (successfully or not).
pub const PROCESS_EXITED: &str = "process.exited";
/// A process could not be started.
pub const PROCESS_SPAWN_FAILED: &str = "process.spawn_failed";
/// A fan-out stage moved on to the next input line.
pub const XARGS_ITEM: &str = "xargs.item";
/// A pipeline ended with a cancellation.
pub const PIPELINE_CANCELLED: &str = "pipeline.cancelled";
