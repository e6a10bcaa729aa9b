//! Cooperative cancellation for pipelines.
//!
//! A [`CancellationToken`] attached to a line stream is raced against every
//! pull. Cancelling it ends the stream with [`LineflowError::Cancelled`],
//! which drops every upstream stage and process handle.
//!
//! [`LineflowError::Cancelled`]: crate::errors::LineflowError::Cancelled

mod token;

pub use token::CancellationToken;
