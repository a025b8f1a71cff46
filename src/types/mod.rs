pub mod error;
pub mod pending_tx_hash;
