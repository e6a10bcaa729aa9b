//! Task ownership helpers.

use crate::errors::{LineflowError, LineflowResult};
use std::future::Future;
use tokio::task::JoinHandle;

/// A spawned task that is aborted when its owner drops it.
///
/// Used for work tied to a pipeline value (stdin feeders, stderr readers,
/// `for_each` callbacks) so abandoning the pipeline does not leave tasks
/// running in the background.
#[derive(Debug)]
pub struct AbortOnDrop<T> {
    handle: Option<JoinHandle<T>>,
}

impl<T: Send + 'static> AbortOnDrop<T> {
    /// Spawns `future` on the current tokio runtime.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            handle: Some(tokio::spawn(future)),
        }
    }

    /// Waits for the task to finish.
    ///
    /// A panic or abort inside the task becomes [`LineflowError::Join`].
    pub async fn join(mut self) -> LineflowResult<T> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| LineflowError::Join("task already joined".to_string()))?;
        handle
            .await
            .map_err(|join_error| LineflowError::Join(join_error.to_string()))
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_join_returns_output() {
        let task = AbortOnDrop::spawn(async { 7 });
        assert_eq!(task.join().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_panic_becomes_join_error() {
        let task = AbortOnDrop::spawn(async { panic!("boom") });
        let err: LineflowError = task.join().await.map(|()| ()).unwrap_err();
        assert!(matches!(err, LineflowError::Join(_)));
    }

    #[tokio::test]
    async fn test_drop_aborts() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();
        let task = AbortOnDrop::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            flag.store(true, Ordering::SeqCst);
        });

        drop(task);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }
}
