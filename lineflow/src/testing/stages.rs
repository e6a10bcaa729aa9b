//! Mock stages for testing.

use crate::errors::{LineflowError, LineflowResult};
use crate::stages::{Applied, Stage};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// A pass-through stage that records every line it sees.
///
/// Clones share the same record, so a test can keep one clone while the
/// pipeline owns another.
#[derive(Debug, Clone)]
pub struct RecordingStage {
    name: String,
    seen: Arc<Mutex<Vec<String>>>,
}

impl RecordingStage {
    /// Creates a new recording stage.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns the lines seen so far.
    #[must_use]
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().clone()
    }

    /// Returns the number of lines seen so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.seen.lock().len()
    }
}

#[async_trait]
impl Stage<String> for RecordingStage {
    type Output = String;

    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&mut self, item: String) -> LineflowResult<Applied<String>> {
        self.seen.lock().push(item.clone());
        Ok(Applied::One(item))
    }
}

/// A stage that fails on a given line and passes everything else through.
#[derive(Debug, Clone)]
pub struct FailingStage {
    name: String,
    fail_on: String,
}

impl FailingStage {
    /// Creates a stage failing when it sees `fail_on`.
    #[must_use]
    pub fn new(name: impl Into<String>, fail_on: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fail_on: fail_on.into(),
        }
    }
}

#[async_trait]
impl Stage<String> for FailingStage {
    type Output = String;

    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&mut self, item: String) -> LineflowResult<Applied<String>> {
        if item == self.fail_on {
            return Err(LineflowError::transform(
                &self.name,
                anyhow::anyhow!("refused line '{item}'"),
            ));
        }
        Ok(Applied::One(item))
    }
}
