//! Sequential, pull-based stage driver.

use super::Stage;
use crate::errors::LineflowResult;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use tracing::warn;

struct RunnerState<T, S: Stage<T>>
where
    T: Send + 'static,
{
    upstream: BoxStream<'static, LineflowResult<T>>,
    stage: S,
    /// Outputs of the single item currently in flight.
    pending: VecDeque<S::Output>,
    done: bool,
}

/// Appends `stage` to `upstream`.
///
/// The returned stream pulls exactly one upstream item per step, awaits the
/// stage, hands every produced output downstream, and only then pulls again.
/// Upstream errors pass through; the first error ends the stream.
pub fn run_stage<T, S>(
    upstream: BoxStream<'static, LineflowResult<T>>,
    stage: S,
) -> BoxStream<'static, LineflowResult<S::Output>>
where
    T: Send + 'static,
    S: Stage<T>,
{
    let state = RunnerState {
        upstream,
        stage,
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(out) = st.pending.pop_front() {
                return Some((Ok(out), st));
            }
            if st.done {
                return None;
            }

            match st.upstream.next().await {
                None => return None,
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(e), st));
                }
                Some(Ok(item)) => match st.stage.process(item).await {
                    Ok(applied) => st.pending.extend(applied),
                    Err(e) => {
                        warn!(stage = st.stage.name(), error = %e, "Stage failed");
                        st.done = true;
                        return Some((Err(e), st));
                    }
                },
            }
        }
    })
    .boxed()
}
