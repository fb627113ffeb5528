use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::providers::KeywordProvider;

/// Split `keywords` into contiguous chunks of at most `max` entries, in input order.
pub fn split_batches(keywords: &[String], max: usize) -> Vec<&[String]> {
    keywords.chunks(max.max(1)).collect()
}

/// Query `provider` batch by batch and concatenate the rows in batch order.
///
/// Batches run one at a time with the provider's pacing delay between them
/// (never before the first or after the last). The first failing batch aborts
/// the whole call; rows from earlier batches are dropped.
pub async fn dispatch<P: KeywordProvider>(provider: &P, keywords: &[String]) -> Result<Vec<P::Row>> {
    let batches = split_batches(keywords, provider.max_batch());
    let total = batches.len();
    let mut rows = Vec::new();

    for (idx, batch) in batches.into_iter().enumerate() {
        if idx > 0 {
            tokio::time::sleep(provider.pacing()).await;
        }
        debug!(provider = provider.name(), batch = idx + 1, total, size = batch.len(), "dispatching batch");

        let batch_rows = provider
            .fetch_batch(batch)
            .await
            .map_err(|e| AppError::provider(provider.name(), format!("batch {}/{}", idx + 1, total), e))?;
        rows.extend(batch_rows);
    }

    info!(provider = provider.name(), batches = total, rows = rows.len(), "provider query complete");
    Ok(rows)
}
