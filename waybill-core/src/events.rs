use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which resource a mutation touched, so subscribers can invalidate just
/// the affected reads instead of clearing a shared cache by convention.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceKind {
    Charges,
    Receivable,
    PaymentAttempts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeNotification {
    pub booking_id: Uuid,
    pub resource: ResourceKind,
    pub emitted_at: i64,
}

impl ChangeNotification {
    pub fn new(booking_id: Uuid, resource: ResourceKind) -> Self {
        Self {
            booking_id,
            resource,
            emitted_at: chrono::Utc::now().timestamp(),
        }
    }
}
