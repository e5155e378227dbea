// Fetcher Shutdown Token

use tokio::sync::watch;

/// Shutdown signal shared by every fetch loop of a process
#[derive(Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    /// Check if shutdown was requested
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for shutdown signal (returns at once if already signalled)
    pub async fn wait(&mut self) {
        if self.is_shutdown() {
            return;
        }
        let _ = self.rx.changed().await;
    }
}

/// Shutdown sender
pub struct ShutdownSender {
    tx: watch::Sender<bool>,
}

impl ShutdownSender {
    /// Signal shutdown to all fetchers
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }

    /// Another token for an additional fetch loop
    pub fn subscribe(&self) -> ShutdownToken {
        ShutdownToken {
            rx: self.tx.subscribe(),
        }
    }
}

/// Create a shutdown channel
pub fn shutdown_channel() -> (ShutdownSender, ShutdownToken) {
    let (tx, rx) = watch::channel(false);
    (ShutdownSender { tx }, ShutdownToken { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribed_tokens_observe_shutdown() {
        let (sender, first) = shutdown_channel();
        let mut second = sender.subscribe();
        assert!(!first.is_shutdown());

        sender.shutdown();
        second.wait().await;
        assert!(first.is_shutdown());
        assert!(second.is_shutdown());
    }
}
