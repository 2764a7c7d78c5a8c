//! Bounded-concurrency runner for async row callbacks.
//!
//! At most `limit` invocations are in flight; as soon as one completes the next pending position
//! is admitted. Each result is written straight into its pre-allocated slot, so the output is in
//! position order regardless of completion order. The first failure drops every in-flight future
//! and is returned with its position.

use crate::error::{CallbackError, CallbackResult};
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::num::NonZeroUsize;

pub(crate) async fn run_ordered<T, F, Fut>(
    len: usize,
    limit: NonZeroUsize,
    mut task: F,
) -> Result<Vec<T>, (usize, CallbackError)>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = CallbackResult<T>>,
{
    let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(len).collect();
    let mut in_flight = FuturesUnordered::new();
    let mut next = 0;

    loop {
        while next < len && in_flight.len() < limit.get() {
            let position = next;
            let fut = task(position);
            in_flight.push(async move { (position, fut.await) });
            log::trace!("admitted row task {position} ({} in flight)", in_flight.len());
            next += 1;
        }

        match in_flight.next().await {
            Some((position, Ok(value))) => {
                log::trace!("row task {position} completed");
                slots[position] = Some(value);
            }
            Some((position, Err(err))) => return Err((position, err)),
            None => break,
        }
    }

    Ok(slots.into_iter().flatten().collect())
}
