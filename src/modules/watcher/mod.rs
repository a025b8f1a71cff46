pub mod pending_tx_watcher;
