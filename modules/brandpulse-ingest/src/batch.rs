//! Sequential-with-delay batch execution.
//!
//! A second, independent pacing discipline from the resolver cache's
//! limiter, for callers holding a coarser external quota. Items run strictly
//! one at a time; a failing item is logged and dropped from the result set,
//! never retried.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

/// Fixed safety margin between items inside a batch.
const ITEM_DELAY: Duration = Duration::from_millis(200);

/// Run `f` over `items` in fixed-size batches, waiting `inter_batch_delay`
/// between batches. Returns the successful results in input order.
pub async fn run_batched<T, R, F, Fut>(
    items: Vec<T>,
    batch_size: usize,
    inter_batch_delay: Duration,
    mut f: F,
) -> Vec<R>
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = anyhow::Result<R>>,
{
    let batch_size = batch_size.max(1);
    let total = items.len();
    let mut results = Vec::with_capacity(total);

    let mut iter = items.into_iter().peekable();
    let mut batch_index = 0usize;
    let mut item_index = 0usize;

    while iter.peek().is_some() {
        if batch_index > 0 {
            sleep(inter_batch_delay).await;
        }

        let batch: Vec<T> = iter.by_ref().take(batch_size).collect();
        debug!(batch = batch_index, items = batch.len(), "Processing batch");

        for (offset, item) in batch.into_iter().enumerate() {
            if offset > 0 {
                sleep(ITEM_DELAY).await;
            }
            match f(item).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!(item = item_index, error = %e, "Batch item failed, skipping");
                }
            }
            item_index += 1;
        }

        batch_index += 1;
    }

    debug!(
        total,
        succeeded = results.len(),
        batches = batch_index,
        "Batch run complete"
    );
    results
}
