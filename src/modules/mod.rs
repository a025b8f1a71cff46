pub mod config;
pub mod node_client;
pub mod watcher;
