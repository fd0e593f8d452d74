use tokio::sync::broadcast;

use ck_core::ports::NotifierPort;

/// Fan-out of the payload-free store-changed signal over a tokio
/// broadcast channel. Surfaces subscribe and re-query on receipt.
pub struct BroadcastNotifier {
    tx: broadcast::Sender<()>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(16)
    }
}

impl NotifierPort for BroadcastNotifier {
    fn store_changed(&self) {
        // A lagging or absent receiver must never fail the mutation
        // that emitted the signal.
        let _ = self.tx.send(());
    }

    fn ready(&self) -> bool {
        self.tx.receiver_count() > 0
    }
}
