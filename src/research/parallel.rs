// src/research/parallel.rs — Bounded, order-preserving parallel invocation
//
// N inputs always produce N outputs, index-aligned to the inputs no matter
// which call finishes first. A failing call becomes an inline error at its
// index instead of aborting the batch.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::stream::{self, StreamExt};

use crate::infra::errors::DossierError;

/// Run `call` over `items` with at most `width` in flight.
///
/// `notify` fires after each completion with (completed, total); it is
/// observational only and says nothing about which index finished.
pub async fn map_bounded<T, R, F, Fut, N>(
    items: Vec<T>,
    width: usize,
    call: F,
    notify: N,
) -> Vec<Result<R, DossierError>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R, DossierError>>,
    N: Fn(usize, usize),
{
    let total = items.len();
    let completed = AtomicUsize::new(0);
    let completed = &completed;
    let notify = &notify;

    stream::iter(items.into_iter().map(|item| {
        let fut = call(item);
        async move {
            let result = fut.await;
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            notify(done, total);
            result
        }
    }))
    .buffered(width.max(1))
    .collect()
    .await
}
