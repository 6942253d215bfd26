//! Strict one-in-flight rendezvous between the writer and batcher tasks
//!
//! `send` completes only after the receiving side has taken the entry, so
//! the writer can never run more than one entry ahead of the batcher.

use contracts::LogEntry;
use tokio::sync::{mpsc, oneshot};

type Slot = (LogEntry, oneshot::Sender<()>);

/// The receiving half is gone; the entry was not taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HandoffClosed;

/// Create a connected rendezvous pair
pub(crate) fn handoff() -> (HandoffSender, HandoffReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (HandoffSender { tx }, HandoffReceiver { rx })
}

pub(crate) struct HandoffSender {
    tx: mpsc::Sender<Slot>,
}

impl HandoffSender {
    /// Hand `entry` over, waiting until the receiver has taken it
    pub(crate) async fn send(&self, entry: LogEntry) -> Result<(), HandoffClosed> {
        let (taken_tx, taken_rx) = oneshot::channel();
        self.tx
            .send((entry, taken_tx))
            .await
            .map_err(|_| HandoffClosed)?;
        taken_rx.await.map_err(|_| HandoffClosed)
    }
}

pub(crate) struct HandoffReceiver {
    rx: mpsc::Receiver<Slot>,
}

impl HandoffReceiver {
    /// Take the next entry; `None` once the sender is dropped
    ///
    /// Cancel safe: nothing is awaited after the slot is taken.
    pub(crate) async fn recv(&mut self) -> Option<LogEntry> {
        let (entry, taken) = self.rx.recv().await?;
        let _ = taken.send(());
        Some(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_send_waits_for_receiver() {
        let (tx, mut rx) = handoff();

        let send = tokio::spawn(async move { tx.send(LogEntry::new("a", "", "", "1")).await });

        // Nobody has taken the entry yet
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!send.is_finished());

        let entry = rx.recv().await.unwrap();
        assert_eq!(entry.message, "1");
        assert_eq!(send.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn test_send_fails_when_receiver_dropped() {
        let (tx, rx) = handoff();
        drop(rx);
        let result = timeout(Duration::from_secs(1), tx.send(LogEntry::default()))
            .await
            .unwrap();
        assert_eq!(result, Err(HandoffClosed));
    }

    #[tokio::test]
    async fn test_pending_send_fails_when_receiver_dropped_later() {
        let (tx, rx) = handoff();
        let send = tokio::spawn(async move { tx.send(LogEntry::default()).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(rx);
        let result = timeout(Duration::from_secs(1), send).await.unwrap().unwrap();
        assert_eq!(result, Err(HandoffClosed));
    }

    #[tokio::test]
    async fn test_recv_none_after_sender_dropped() {
        let (tx, mut rx) = handoff();
        drop(tx);
        assert!(rx.recv().await.is_none());
    }
}
