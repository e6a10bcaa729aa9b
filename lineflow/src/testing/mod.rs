//! Testing utilities for lineflow pipelines.
//!
//! This module provides:
//! - [`ScriptedExecutor`], an in-memory process executor with a recorded
//!   spawn/exit timeline
//! - Recording and failing stages

mod executor;
mod stages;

pub use executor::{ScriptedExecutor, ScriptedProcess};
pub use stages::{FailingStage, RecordingStage};
