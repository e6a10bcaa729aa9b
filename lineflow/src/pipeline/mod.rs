//! Line pipelines over processes, files and in-memory sources.
//!
//! - [`LineStream`]: a lazy, single-consumer sequence of lines with
//!   chainable stages and terminal consumers
//! - [`FanOutStream`]: one process per line, viewed either as ordered
//!   results or as one concatenated output stream
//! - [`codec`]: byte-chunk/line conversion

pub mod codec;
mod fan_out;
mod file;
mod guard;
mod line_stream;
mod spawn;


pub use fan_out::FanOutStream;
pub use line_stream::LineStream;

use crate::errors::LineflowResult;
use futures::stream::BoxStream;

/// An ordered sequence of byte chunks: process stdout/stdin or file contents.
pub type ByteStream = BoxStream<'static, LineflowResult<Vec<u8>>>;

/// An ordered sequence of decoded lines.
pub type LineResultStream = BoxStream<'static, LineflowResult<String>>;
