use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;
use waybill_core::events::{ChangeNotification, ResourceKind};

/// Broadcasts which resource changed after each successful mutation, so
/// collaborators invalidate their reads explicitly instead of relying on
/// a shared cache being cleared by convention.
#[derive(Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<ChangeNotification>,
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotification> {
        self.tx.subscribe()
    }

    /// Fire-and-forget: a mutation must not fail because nobody is
    /// listening.
    pub fn emit(&self, booking_id: Uuid, resource: ResourceKind) {
        let notification = ChangeNotification::new(booking_id, resource);
        if self.tx.send(notification).is_err() {
            debug!("No subscribers for change on booking {}", booking_id);
        }
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(64)
    }
}
