//! Order-preserving partitioning of chunks into API-sized batches.

use super::types::ProcessingError;

/// Split `items` into consecutive groups of at most `batch_size`, the last possibly smaller.
pub fn partition_batches<T>(
    items: &[T],
    batch_size: usize,
) -> Result<std::slice::Chunks<'_, T>, ProcessingError> {
    if batch_size == 0 {
        return Err(ProcessingError::InvalidBatchSize);
    }
    Ok(items.chunks(batch_size))
}
