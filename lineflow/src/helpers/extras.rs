//! Stateless shell-style helpers.

use crate::pipeline::LineStream;
use crate::process::ProcessSpec;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

/// Returns the number of CPUs available to this process, at least 1.
#[must_use]
pub fn nproc() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

/// Splits `s` on runs of whitespace, ignoring leading and trailing whitespace.
#[must_use]
pub fn split(s: &str) -> Vec<String> {
    s.split_whitespace().map(String::from).collect()
}

/// Sleeps for `duration`.
pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// Streams the lines of the file at `path`, opening it on the first pull.
pub fn cat(path: impl AsRef<Path>) -> LineStream {
    LineStream::from_file(path)
}

/// Shorthand for [`ProcessSpec::new`].
#[must_use]
pub fn command(program: impl Into<String>) -> ProcessSpec {
    ProcessSpec::new(program)
}
