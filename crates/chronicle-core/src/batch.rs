//! Batch correlation ids.

use uuid::Uuid;

/// Zero-argument generator of fresh batch ids.
///
/// One id is drawn per `store_events` call and shared by every event of
/// that commit. Implementations must be safe to call concurrently.
pub trait BatchIdProvider: Send + Sync {
    /// Returns a new, unique batch id.
    fn next_batch_id(&self) -> Uuid;
}

/// Production provider issuing time-ordered (v7) UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomBatchIds;

impl BatchIdProvider for RandomBatchIds {
    fn next_batch_id(&self) -> Uuid {
        Uuid::now_v7()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_batch_ids_are_unique() {
        let provider = RandomBatchIds;

        let first = provider.next_batch_id();
        let second = provider.next_batch_id();

        assert_ne!(first, second);
        assert!(!first.is_nil());
    }
}
