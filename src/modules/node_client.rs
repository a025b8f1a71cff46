use std::{future::Future, sync::Arc};

use alloy::{
    primitives::B256,
    providers::{Provider, ProviderBuilder, RootProvider},
    pubsub::{ConnectionHandle, PubSubConnect, PubSubFrontend},
    rpc::client::{ClientBuilder, WsConnect},
    transports::{TransportErrorKind, TransportResult},
};
use futures::{channel::mpsc, SinkExt, Stream, StreamExt};
use log::{debug, info, warn};
use tokio::task::JoinHandle;

use crate::{
    modules::config::Config,
    types::{error::WatchError, pending_tx_hash::PendingTx},
};

const HASH_CHANNEL_SIZE: usize = 256;

/// WebSocket connection to the node. Owns transport and JSON-RPC framing.
pub struct NodeClient {
    provider: Arc<RootProvider<PubSubFrontend>>,
}

/// A live `newPendingTransactions` subscription split into the two signal
/// sources the watcher consumes.
pub struct PendingTxSubscription {
    pub hashes: mpsc::Receiver<PendingTx>,
    /// Yields at most one error, after which `hashes` receives nothing more.
    pub errors: mpsc::Receiver<WatchError>,
    pub guard: SubscriptionGuard,
}

/// WebSocket connector that refuses to reconnect.
///
/// alloy's pubsub service reconnects and re-issues subscriptions when the
/// backend drops. Failing the reconnect instead shuts the service down, which
/// closes every subscription and ends the watcher with `SubscriptionClosed`.
#[derive(Debug, Clone)]
pub struct SingleShotConnect(WsConnect);

impl SingleShotConnect {
    pub fn new(url: impl Into<String>) -> Self {
        Self(WsConnect::new(url.into()))
    }
}

impl PubSubConnect for SingleShotConnect {
    fn is_local(&self) -> bool {
        self.0.is_local()
    }

    fn connect(&self) -> impl Future<Output = TransportResult<ConnectionHandle>> + Send {
        self.0.connect()
    }

    fn try_reconnect(&self) -> impl Future<Output = TransportResult<ConnectionHandle>> + Send {
        warn!("WebSocket connection to the node dropped, not reconnecting");
        async { Err(TransportErrorKind::custom_str("reconnecting to the node is disabled")) }
    }
}

/// Releases the node subscription when dropped.
pub struct SubscriptionGuard {
    provider: Arc<RootProvider<PubSubFrontend>>,
    id: B256,
    forwarder: JoinHandle<()>,
}

impl NodeClient {
    /// Opens a single WebSocket connection to `config.ws_url`.
    ///
    /// # Arguments
    /// * `config` - Validated endpoint configuration
    ///
    /// # Returns
    /// * `Result<Self, WatchError>` - The connected client, or `WatchError::Connect`
    pub async fn connect(config: &Config) -> Result<Self, WatchError> {
        info!("Connecting to WebSocket provider: {}", config.ws_url);

        let client = ClientBuilder::default()
            .pubsub(SingleShotConnect::new(config.ws_url.as_str()))
            .await
            .map_err(|source| WatchError::Connect {
                url: config.ws_url.to_string(),
                source,
            })?;
        let provider = ProviderBuilder::new().on_client(client);

        info!("Connected to WebSocket provider");
        Ok(Self {
            provider: Arc::new(provider),
        })
    }

    /// Creates the `newPendingTransactions` subscription and starts routing
    /// its notifications into a [`PendingTxSubscription`].
    ///
    /// # Returns
    /// * `Result<PendingTxSubscription, WatchError>` - Hash and error streams plus the
    ///   guard that releases the subscription, or `WatchError::Subscribe`
    pub async fn subscribe_pending_transactions(
        &self,
    ) -> Result<PendingTxSubscription, WatchError> {
        let sub = self
            .provider
            .subscribe_pending_transactions()
            .await
            .map_err(WatchError::Subscribe)?;
        let id = *sub.local_id();

        let (hash_tx, hashes) = mpsc::channel(HASH_CHANNEL_SIZE);
        let (error_tx, errors) = mpsc::channel(1);
        let forwarder = tokio::spawn(forward(sub.into_result_stream(), hash_tx, error_tx));

        info!("Subscribed to pending transactions [id: {}]", id);
        Ok(PendingTxSubscription {
            hashes,
            errors,
            guard: SubscriptionGuard {
                provider: self.provider.clone(),
                id,
                forwarder,
            },
        })
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.forwarder.abort();
        match self.provider.unsubscribe(self.id) {
            Ok(()) => info!("Unsubscribed from pending transactions [id: {}]", self.id),
            Err(e) => warn!("Failed to unsubscribe [id: {}]: {}", self.id, e),
        }
    }
}

/// Routes subscription notifications into the hash and error channels.
///
/// The first undecodable notification, or the end of the subscription, is
/// sent as the single error and forwarding stops there.
async fn forward<S>(
    results: S,
    mut hash_tx: mpsc::Sender<PendingTx>,
    mut error_tx: mpsc::Sender<WatchError>,
) where
    S: Stream<Item = Result<B256, serde_json::Error>>,
{
    futures::pin_mut!(results);

    let error = loop {
        match results.next().await {
            Some(Ok(hash)) => {
                if hash_tx.send(PendingTx::new(hash)).await.is_err() {
                    debug!("Watcher stopped consuming, ending forwarder");
                    return;
                }
            }
            Some(Err(e)) => break WatchError::Decode(e),
            None => break WatchError::SubscriptionClosed,
        }
    };

    debug!("Forwarding terminal subscription error: {}", error);
    if error_tx.send(error).await.is_err() {
        debug!("Watcher stopped before the subscription error was delivered");
    }
}
