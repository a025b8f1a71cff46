use std::fmt;

use alloy::{hex, primitives::B256};
use tokio::time::Instant;

/// A transaction hash announced by the node's pending pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTx {
    pub hash: B256,
    pub received_at: Instant,
}

impl PendingTx {
    pub fn new(hash: B256) -> Self {
        Self {
            hash,
            received_at: Instant::now(),
        }
    }
}

/// Renders the stdout line for this hash, without the trailing newline.
impl fmt::Display for PendingTx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pending Transaction Hash: {}", hex::encode_prefixed(self.hash))
    }
}
