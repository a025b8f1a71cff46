pub mod modules;
pub mod types;

use dotenv::dotenv;
use eyre::Result;
use futures::Stream;
use log::{error, info};
use std::{future::Future, io, io::Write};

use modules::config::Config;
use modules::node_client::{NodeClient, PendingTxSubscription};
use modules::watcher::pending_tx_watcher::PendingTransactionWatcher;
use types::{error::WatchError, pending_tx_hash::PendingTx};

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    if let Err(e) = run().await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = Config::from_env()?;
    let client = NodeClient::connect(&config).await?;

    let PendingTxSubscription {
        hashes,
        errors,
        guard,
    } = client.subscribe_pending_transactions().await?;

    let mut watcher = PendingTransactionWatcher::new(io::stdout());
    watch(&mut watcher, hashes, errors, guard, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for interrupt: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await?;
    Ok(())
}

/// Runs the watcher until it fails or `shutdown` resolves, then releases the
/// subscription by dropping `guard` before returning.
///
/// # Returns
/// * `Result<(), WatchError>` - `Ok` on shutdown, the watcher's error otherwise
async fn watch<W, H, E, G, S>(
    watcher: &mut PendingTransactionWatcher<W>,
    hashes: H,
    errors: E,
    guard: G,
    shutdown: S,
) -> Result<(), WatchError>
where
    W: Write,
    H: Stream<Item = PendingTx> + Unpin,
    E: Stream<Item = WatchError> + Unpin,
    S: Future<Output = ()>,
{
    let outcome = tokio::select! {
        err = watcher.run(hashes, errors) => Err(err),
        _ = shutdown => {
            info!("Received interrupt, shutting down");
            Ok(())
        }
    };

    info!("Printed {} pending transaction hashes", watcher.printed());
    drop(guard);
    outcome
}
