//! Bounded fan-out for bulk operations.

use std::future::Future;

use futures::future::join_all;

/// Run `op` over `items` in sequential chunks of `batch_size` concurrent calls.
///
/// Results come back in input order. A failure in one chunk does not stop
/// later chunks.
pub async fn in_batches<'a, T, F, Fut>(items: &'a [T], batch_size: usize, op: F) -> Vec<Fut::Output>
where
    F: Fn(&'a T) -> Fut,
    Fut: Future,
{
    let mut results = Vec::with_capacity(items.len());
    for chunk in items.chunks(batch_size.max(1)) {
        results.extend(join_all(chunk.iter().map(&op)).await);
    }
    results
}
