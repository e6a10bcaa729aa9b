//! Guards that end pipeline streams early.

use crate::context::PipelineContext;
use crate::errors::{LineflowError, LineflowResult};
use crate::events;
use futures::stream::{self, BoxStream, StreamExt};
use tracing::warn;

/// Races every pull of `inner` against the context's cancellation token.
///
/// On cancellation the returned stream yields one `Cancelled` error and ends,
/// dropping `inner` (and with it any process handles it owns). Without a
/// token `inner` is returned unchanged.
pub(crate) fn cancellable<T>(
    inner: BoxStream<'static, LineflowResult<T>>,
    ctx: &PipelineContext,
) -> BoxStream<'static, LineflowResult<T>>
where
    T: Send + 'static,
{
    let Some(token) = ctx.cancel.clone() else {
        return inner;
    };
    let sink = ctx.events.clone();

    stream::unfold(Some(inner), move |state| {
        let token = token.clone();
        let sink = sink.clone();
        async move {
            let mut inner = state?;
            tokio::select! {
                biased;
                reason = token.cancelled() => {
                    warn!(reason = %reason, "Pipeline cancelled");
                    sink.try_emit(
                        events::PIPELINE_CANCELLED,
                        Some(serde_json::json!({ "reason": reason })),
                    );
                    Some((Err(LineflowError::cancelled(reason)), None))
                }
                item = inner.next() => item.map(|item| (item, Some(inner))),
            }
        }
    })
    .boxed()
}

/// Ends `inner` right after its first error.
///
/// Nothing is pulled from `inner` once an error has been yielded, so a
/// fan-out spawns no further processes after a failure.
pub(crate) fn until_first_error<T>(
    inner: BoxStream<'static, LineflowResult<T>>,
) -> BoxStream<'static, LineflowResult<T>>
where
    T: Send + 'static,
{
    stream::unfold(Some(inner), |state| async move {
        let mut inner = state?;
        match inner.next().await? {
            Ok(item) => Some((Ok(item), Some(inner))),
            Err(e) => Some((Err(e), None)),
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancellationToken;
    use crate::events::CollectingEventSink;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_without_token_is_passthrough() {
        let inner = stream::iter(vec![Ok::<_, LineflowError>(1), Ok(2)]).boxed();
        let out: Vec<_> = cancellable(inner, &PipelineContext::new()).collect().await;
        assert_eq!(out.len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_ends_pending_stream() {
        let token = Arc::new(CancellationToken::new());
        let sink = Arc::new(CollectingEventSink::new());
        let ctx = PipelineContext::new()
            .with_cancellation(token.clone())
            .with_event_sink(sink.clone());

        let inner = stream::iter(vec![Ok::<_, LineflowError>(1)])
            .chain(stream::pending())
            .boxed();
        let mut guarded = cancellable(inner, &ctx);

        assert_eq!(guarded.next().await.unwrap().unwrap(), 1);

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            canceller.cancel("user abort");
        });

        let err = guarded.next().await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
        assert!(guarded.next().await.is_none());
        assert_eq!(sink.events_of_type(events::PIPELINE_CANCELLED).len(), 1);
    }

    #[tokio::test]
    async fn test_until_first_error_stops_pulling() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = pulled.clone();
        let inner = stream::iter(vec![
            Ok(1),
            Err(LineflowError::transform("parse", "bad")),
            Ok(3),
            Err(LineflowError::transform("parse", "worse")),
        ])
        .inspect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .boxed();

        let out: Vec<_> = until_first_error(inner).collect().await;

        assert_eq!(out.len(), 2);
        assert_eq!(*out[0].as_ref().unwrap(), 1);
        assert!(matches!(out[1], Err(LineflowError::Transform { .. })));
        assert_eq!(pulled.load(Ordering::SeqCst), 2);
    }
}
