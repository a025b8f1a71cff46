use std::io::Write;

use futures::{Stream, StreamExt};
use log::{debug, info};

use crate::types::{error::WatchError, pending_tx_hash::PendingTx};

/// Prints every pending transaction hash of a subscription until it fails.
pub struct PendingTransactionWatcher<W> {
    out: W,
    printed: u64,
}

impl<W: Write> PendingTransactionWatcher<W> {
    /// Creates a watcher writing one line per hash to `out`.
    pub fn new(out: W) -> Self {
        Self { out, printed: 0 }
    }

    /// Number of hash lines written so far.
    pub fn printed(&self) -> u64 {
        self.printed
    }

    /// Consumes `hashes` until `errors` yields, the hash stream ends or a
    /// write fails, and returns that failure.
    ///
    /// Hashes that are already queued win over a queued error, so nothing the
    /// node delivered before failing is dropped.
    ///
    /// # Arguments
    /// * `hashes` - Pending transaction hashes in arrival order
    /// * `errors` - Terminal subscription errors, at most one is read
    ///
    /// # Returns
    /// * `WatchError` - Why the watcher stopped
    pub async fn run<H, E>(&mut self, mut hashes: H, mut errors: E) -> WatchError
    where
        H: Stream<Item = PendingTx> + Unpin,
        E: Stream<Item = WatchError> + Unpin,
    {
        info!("PendingTransactionWatcher started");

        loop {
            tokio::select! {
                biased;

                next = hashes.next() => match next {
                    Some(pending_tx) => {
                        if let Err(e) = self.print(&pending_tx) {
                            return e;
                        }
                    }
                    None => {
                        // The collaborator sends its error before hanging up.
                        return errors.next().await.unwrap_or(WatchError::SubscriptionClosed);
                    }
                },
                Some(error) = errors.next() => return error,
            }
        }
    }

    fn print(&mut self, pending_tx: &PendingTx) -> Result<(), WatchError> {
        writeln!(self.out, "{pending_tx}").map_err(WatchError::Output)?;
        self.out.flush().map_err(WatchError::Output)?;
        self.printed += 1;

        debug!(
            "Printed pending transaction [hash: {}] {} µs after receipt",
            pending_tx.hash,
            pending_tx.received_at.elapsed().as_micros()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{b256, B256};
    use futures::{channel::mpsc, stream, SinkExt};
    use std::io;

    fn tx(byte: u8) -> PendingTx {
        PendingTx::new(B256::repeat_byte(byte))
    }

    fn output(watcher: PendingTransactionWatcher<Vec<u8>>) -> Vec<String> {
        String::from_utf8(watcher.out)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn prints_single_hash_line() {
        let hash = b256!("abc0000000000000000000000000000000000000000000000000000000000000");
        let mut watcher = PendingTransactionWatcher::new(Vec::new());

        let err = watcher
            .run(stream::iter(vec![PendingTx::new(hash)]), stream::empty::<WatchError>())
            .await;

        assert!(matches!(err, WatchError::SubscriptionClosed));
        assert_eq!(
            output(watcher),
            vec!["Pending Transaction Hash: 0xabc0000000000000000000000000000000000000000000000000000000000000"]
        );
    }

    #[tokio::test]
    async fn prints_hashes_in_arrival_order() {
        let mut watcher = PendingTransactionWatcher::new(Vec::new());

        watcher
            .run(stream::iter(vec![tx(1), tx(2), tx(3)]), stream::empty::<WatchError>())
            .await;

        assert_eq!(watcher.printed(), 3);
        assert_eq!(
            output(watcher),
            vec![tx(1).to_string(), tx(2).to_string(), tx(3).to_string()]
        );
    }

    #[tokio::test]
    async fn error_after_hash_ends_the_run() {
        let (mut hash_tx, hashes) = mpsc::channel(8);
        let (mut error_tx, errors) = mpsc::channel(1);
        hash_tx.send(tx(1)).await.unwrap();
        error_tx.send(WatchError::SubscriptionClosed).await.unwrap();

        let mut watcher = PendingTransactionWatcher::new(Vec::new());
        let err = watcher.run(hashes, errors).await;

        assert!(matches!(err, WatchError::SubscriptionClosed));
        assert_eq!(output(watcher), vec![tx(1).to_string()]);
        drop(hash_tx);
    }

    #[tokio::test]
    async fn error_without_hashes_prints_nothing() {
        let (_hash_tx, hashes) = mpsc::channel::<PendingTx>(8);
        let (mut error_tx, errors) = mpsc::channel(1);
        error_tx.send(WatchError::SubscriptionClosed).await.unwrap();

        let mut watcher = PendingTransactionWatcher::new(Vec::new());
        let err = watcher.run(hashes, errors).await;

        assert!(matches!(err, WatchError::SubscriptionClosed));
        assert_eq!(watcher.printed(), 0);
        assert!(output(watcher).is_empty());
    }

    #[tokio::test]
    async fn hash_after_error_is_never_consumed() {
        let (mut hash_tx, mut hashes) = mpsc::channel(8);
        let (mut error_tx, errors) = mpsc::channel(1);
        error_tx.send(WatchError::SubscriptionClosed).await.unwrap();

        let mut watcher = PendingTransactionWatcher::new(Vec::new());
        let err = watcher.run(&mut hashes, errors).await;
        assert!(matches!(err, WatchError::SubscriptionClosed));

        // The receiver is still open, so this hash is deliverable.
        hash_tx.send(tx(9)).await.unwrap();

        assert_eq!(watcher.printed(), 0);
        assert!(output(watcher).is_empty());
        assert_eq!(hashes.try_next().unwrap().map(|tx| tx.hash), Some(B256::repeat_byte(9)));
    }

    #[tokio::test]
    async fn hash_stream_end_reports_pending_error() {
        let decode = serde_json::from_str::<B256>("1").unwrap_err();
        let errors = stream::iter(vec![WatchError::Decode(decode)]);
        let mut watcher = PendingTransactionWatcher::new(Vec::new());

        let err = watcher.run(stream::iter(vec![tx(4)]), errors).await;

        assert!(matches!(err, WatchError::Decode(_)));
        assert_eq!(output(watcher), vec![tx(4).to_string()]);
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn write_failure_is_fatal() {
        let mut watcher = PendingTransactionWatcher::new(BrokenPipe);

        let err = watcher
            .run(stream::iter(vec![tx(1), tx(2)]), stream::pending::<WatchError>())
            .await;

        assert!(matches!(err, WatchError::Output(e) if e.kind() == io::ErrorKind::BrokenPipe));
        assert_eq!(watcher.printed(), 0);
    }
}
