use std::fmt::Debug;
use tokio::sync::{RwLock, broadcast};

// Notifier lets the session tasks know that the server is shutting down.
#[derive(Debug)]
pub struct Notifier {
    shutdown_tx: RwLock<Option<broadcast::Sender<()>>>,
}

impl Notifier {
    pub fn new() -> Notifier {
        let (shutdown_tx, _) = broadcast::channel(1);
        Notifier {
            shutdown_tx: RwLock::new(Some(shutdown_tx)),
        }
    }

    // Tells every subscribed Listener that shutdown has started.
    pub async fn notify(&self) {
        drop(self.shutdown_tx.write().await.take());
    }

    pub async fn subscribe(&self) -> Listener {
        let sender_opt = self.shutdown_tx.read().await;
        Listener {
            shutdown: sender_opt.is_none(),
            shutdown_rx: sender_opt.as_ref().map(|tx| tx.subscribe()),
        }
    }
}

// Held by each session task for as long as it runs.
#[derive(Debug)]
pub struct Listener {
    shutdown: bool,
    shutdown_rx: Option<broadcast::Receiver<()>>,
}

impl Listener {
    pub fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    // Waits for the shutdown notice. Returns immediately if it was already received.
    pub async fn listen(&mut self) {
        if self.shutdown {
            return;
        }
        if let Some(rx) = self.shutdown_rx.as_mut() {
            // Only a close is ever "sent", so lagging is impossible.
            let _ = rx.recv().await;
        }
        self.shutdown = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn listeners_hear_notify() {
        let notifier = Notifier::new();
        let mut listener = notifier.subscribe().await;
        assert!(!listener.is_shutdown());

        let pending = tokio::time::timeout(Duration::from_millis(20), listener.listen()).await;
        assert!(pending.is_err(), "listen returned before notify");

        notifier.notify().await;
        tokio::time::timeout(Duration::from_secs(1), listener.listen()).await.unwrap();
        assert!(listener.is_shutdown());
    }

    #[tokio::test]
    async fn subscribing_after_notify_is_already_shut_down() {
        let notifier = Notifier::new();
        notifier.notify().await;
        let mut listener = notifier.subscribe().await;
        assert!(listener.is_shutdown());
        listener.listen().await;
    }
}
