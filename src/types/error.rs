use alloy::transports::TransportError;

/// Everything that can stop the watcher. None of these are retried.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to connect to WebSocket provider {url}")]
    Connect {
        url: String,
        #[source]
        source: TransportError,
    },
    #[error("failed to subscribe to pending transactions")]
    Subscribe(#[source] TransportError),
    #[error("received a pending transaction notification that is not a hash")]
    Decode(#[source] serde_json::Error),
    #[error("pending transaction subscription closed by the provider")]
    SubscriptionClosed,
    #[error("failed to write pending transaction hash to output")]
    Output(#[source] std::io::Error),
}
