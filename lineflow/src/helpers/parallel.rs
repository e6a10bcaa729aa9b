//! Bounded-parallelism fan-out for side-effecting work.

use crate::errors::{BoxError, LineflowError, LineflowResult};
use futures::future;
use futures::stream::{self, Stream, StreamExt};
use std::future::Future;
use tracing::{debug, warn};

/// Runs `f` over `input` with at most `parallel` invocations in flight.
///
/// Items are admitted in input order and may complete in any order. Results
/// are discarded; the call resolves once every admitted invocation has
/// finished. A failure does not stop admission: a single failure is
/// returned as-is, several are returned together as
/// [`LineflowError::Aggregate`]. `parallel == 0` is treated as 1.
///
/// # Example
///
/// ```no_run
/// use lineflow::helpers::{sleep, xargs_iter};
/// use std::time::Duration;
///
/// # async fn demo() -> lineflow::LineflowResult<()> {
/// xargs_iter(
///     [300u64, 200, 200],
///     |ms| async move {
///         sleep(Duration::from_millis(ms)).await;
///         Ok::<_, std::convert::Infallible>(ms * 2)
///     },
///     3,
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn xargs<S, T, F, Fut, R, E>(input: S, f: F, parallel: usize) -> LineflowResult<()>
where
    S: Stream<Item = T>,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
    E: Into<BoxError>,
{
    let limit = parallel.max(1);
    debug!(parallel = limit, "Starting bounded xargs");

    let mut failures: Vec<LineflowError> = input
        .map(f)
        .buffer_unordered(limit)
        .filter_map(|outcome| {
            future::ready(outcome.err().map(|e| LineflowError::transform("xargs", e)))
        })
        .collect()
        .await;

    match failures.len() {
        0 => Ok(()),
        1 => Err(failures.remove(0)),
        n => {
            warn!(failures = n, "Bounded xargs finished with failures");
            Err(LineflowError::Aggregate(failures))
        }
    }
}

/// [`xargs`] over any iterable.
pub async fn xargs_iter<I, F, Fut, R, E>(items: I, f: F, parallel: usize) -> LineflowResult<()>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<R, E>>,
    E: Into<BoxError>,
{
    xargs(stream::iter(items), f, parallel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct Gauge {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Gauge {
        fn enter(&self) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn exit(&self) {
            self.current.fetch_sub(1, Ordering::SeqCst);
        }
    }

    async fn run_with_gauge(parallel: usize) -> usize {
        let gauge = Arc::new(Gauge::default());
        xargs_iter(
            0..8u64,
            |n| {
                let gauge = gauge.clone();
                async move {
                    gauge.enter();
                    tokio::time::sleep(Duration::from_millis(10 + n % 3)).await;
                    gauge.exit();
                    Ok::<_, Infallible>(())
                }
            },
            parallel,
        )
        .await
        .unwrap();
        gauge.peak.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn test_respects_cap() {
        assert_eq!(run_with_gauge(3).await, 3);
    }

    #[tokio::test]
    async fn test_zero_means_sequential() {
        assert_eq!(run_with_gauge(0).await, 1);
    }

    #[tokio::test]
    async fn test_admits_in_input_order() {
        let admitted = Arc::new(Mutex::new(Vec::new()));
        let log = admitted.clone();
        xargs(
            stream::iter(vec![3u64, 2, 2, 1]),
            move |n| {
                log.lock().push(n);
                async move {
                    tokio::time::sleep(Duration::from_millis(n * 5)).await;
                    Ok::<_, Infallible>(n)
                }
            },
            2,
        )
        .await
        .unwrap();
        assert_eq!(*admitted.lock(), vec![3, 2, 2, 1]);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_admission() {
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = finished.clone();
        let err = xargs_iter(
            ["1", "x", "3", "y"],
            move |s| {
                let counter = counter.clone();
                async move {
                    let parsed = s.parse::<u32>();
                    counter.fetch_add(1, Ordering::SeqCst);
                    parsed
                }
            },
            2,
        )
        .await
        .unwrap_err();

        assert_eq!(finished.load(Ordering::SeqCst), 4);
        assert!(matches!(err, LineflowError::Aggregate(ref errors) if errors.len() == 2));
    }

    #[tokio::test]
    async fn test_single_failure_returned_as_is() {
        let err = xargs_iter(
            ["ok", "bad"],
            |s| async move {
                if s == "bad" {
                    Err(anyhow::anyhow!("boom"))
                } else {
                    Ok(())
                }
            },
            4,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LineflowError::Transform { ref stage, .. } if stage == "xargs"));
    }
}
