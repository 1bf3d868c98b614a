//! Bounded pool of chunk uploads.

use std::future::Future;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tokio_util::sync::CancellationToken;

use crate::error::UploadError;

/// Runs `start(0)..start(total - 1)` with at most `concurrency` futures in
/// flight.
///
/// Indices are admitted in ascending order as slots free up, so completion
/// order is arbitrary. The first error is returned immediately and the
/// remaining in-flight futures are dropped. Cancellation is checked before
/// each admission; futures already running observe the token themselves.
pub async fn run_pool<F, Fut>(
    total: u64,
    concurrency: usize,
    cancel: &CancellationToken,
    mut start: F,
) -> Result<(), UploadError>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<(), UploadError>>,
{
    let concurrency = concurrency.max(1);
    let mut in_flight = FuturesUnordered::new();
    let mut next = 0u64;

    loop {
        while next < total && in_flight.len() < concurrency {
            if cancel.is_cancelled() {
                return Err(UploadError::Cancelled);
            }
            in_flight.push(start(next));
            next += 1;
        }

        match in_flight.next().await {
            Some(Ok(())) => {}
            Some(Err(e)) => return Err(e),
            None => return Ok(()),
        }
    }
}
