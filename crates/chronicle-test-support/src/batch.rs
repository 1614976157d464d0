//! Deterministic `BatchIdProvider` implementations for tests.

use std::sync::atomic::{AtomicU64, Ordering};

use chronicle_core::batch::BatchIdProvider;
use uuid::Uuid;

/// Always hands out the same batch id.
#[derive(Debug, Clone, Copy)]
pub struct FixedBatchId(pub Uuid);

impl BatchIdProvider for FixedBatchId {
    fn next_batch_id(&self) -> Uuid {
        self.0
    }
}

/// Hands out `00000000-0000-0000-0000-000000000001`, `...0002`, and so on.
#[derive(Debug, Default)]
pub struct SequenceBatchIds {
    issued: AtomicU64,
}

impl SequenceBatchIds {
    /// Creates a provider whose first id ends in `1`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id issued as the `n`-th call (1-based).
    #[must_use]
    pub fn nth(n: u64) -> Uuid {
        Uuid::from_u128(u128::from(n))
    }
}

impl BatchIdProvider for SequenceBatchIds {
    fn next_batch_id(&self) -> Uuid {
        Self::nth(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }
}
