use async_trait::async_trait;
use uuid::Uuid;
use waybill_billing::{PaymentAttempt, Receivable};
use waybill_core::booking::Booking;
use waybill_core::BillingResult;
use waybill_ledger::ChargeLedger;

/// Booking reads. Bookings are owned by the back-office CRUD layer; the
/// engine only reads them. Implementations map transport failures to
/// `BillingError::Transient` so the caller's retry layer can classify
/// them.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn get_booking(&self, id: Uuid) -> BillingResult<Booking>;
}

#[async_trait]
pub trait LedgerRepository: Send + Sync {
    async fn get_ledger(&self, booking_id: Uuid) -> BillingResult<Option<ChargeLedger>>;
    async fn save_ledger(&self, ledger: &ChargeLedger) -> BillingResult<()>;
}

#[async_trait]
pub trait ReceivableRepository: Send + Sync {
    async fn get_receivable(&self, booking_id: Uuid) -> BillingResult<Option<Receivable>>;
    async fn save_receivable(&self, receivable: &Receivable) -> BillingResult<()>;
}

#[async_trait]
pub trait AttemptRepository: Send + Sync {
    async fn insert_attempt(&self, attempt: &PaymentAttempt) -> BillingResult<()>;
    async fn get_attempt(&self, id: Uuid) -> BillingResult<Option<PaymentAttempt>>;
    async fn update_attempt(&self, attempt: &PaymentAttempt) -> BillingResult<()>;
    /// Most recent attempt for a booking, used to derive the payment state.
    async fn latest_attempt(&self, booking_id: Uuid) -> BillingResult<Option<PaymentAttempt>>;
}
