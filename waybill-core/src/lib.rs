pub mod booking;
pub mod events;
pub mod pii;

/// The single error taxonomy for the billing engine. Every call surface
/// reports failures through this enum so the UI layer can map each class
/// to one user-visible behavior.
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("Duplicate charge for {kind} {subtype}")]
    DuplicateSubtype { kind: String, subtype: String },

    #[error("Invalid monetary amount: {0}")]
    InvalidAmount(i64),

    #[error("GCash payment requires a receipt image")]
    MissingReceipt,

    #[error("Receivable already settled for booking {0}")]
    AlreadyPaid(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid payment transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Transient I/O failure: {0}")]
    Transient(String),
}

impl BillingError {
    /// Only transient failures are eligible for retry by the surrounding
    /// data-fetch layer, and only on idempotent operations. Validation
    /// errors represent a caller mistake and must never be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BillingError::Transient(_))
    }
}

pub type BillingResult<T> = Result<T, BillingError>;
