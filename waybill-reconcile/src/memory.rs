use crate::repository::{
    AttemptRepository, BookingRepository, LedgerRepository, ReceivableRepository,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;
use waybill_billing::{PaymentAttempt, Receivable};
use waybill_core::booking::Booking;
use waybill_core::{BillingError, BillingResult};
use waybill_ledger::ChargeLedger;

/// In-memory repository backing all four traits. Used by the test suite
/// and by local wiring; production deployments swap in the real
/// storage-layer implementations.
#[derive(Default)]
pub struct InMemoryStore {
    bookings: RwLock<HashMap<Uuid, Booking>>,
    ledgers: RwLock<HashMap<Uuid, ChargeLedger>>,
    receivables: RwLock<HashMap<Uuid, Receivable>>,
    // Insertion order doubles as recency order
    attempts: RwLock<Vec<PaymentAttempt>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_booking(&self, booking: Booking) {
        self.bookings.write().await.insert(booking.id, booking);
    }
}

#[async_trait]
impl BookingRepository for InMemoryStore {
    async fn get_booking(&self, id: Uuid) -> BillingResult<Booking> {
        self.bookings
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| BillingError::NotFound(format!("booking {}", id)))
    }
}

#[async_trait]
impl LedgerRepository for InMemoryStore {
    async fn get_ledger(&self, booking_id: Uuid) -> BillingResult<Option<ChargeLedger>> {
        Ok(self.ledgers.read().await.get(&booking_id).cloned())
    }

    async fn save_ledger(&self, ledger: &ChargeLedger) -> BillingResult<()> {
        self.ledgers
            .write()
            .await
            .insert(ledger.booking_id, ledger.clone());
        Ok(())
    }
}

#[async_trait]
impl ReceivableRepository for InMemoryStore {
    async fn get_receivable(&self, booking_id: Uuid) -> BillingResult<Option<Receivable>> {
        Ok(self.receivables.read().await.get(&booking_id).cloned())
    }

    async fn save_receivable(&self, receivable: &Receivable) -> BillingResult<()> {
        self.receivables
            .write()
            .await
            .insert(receivable.booking_id, receivable.clone());
        Ok(())
    }
}

#[async_trait]
impl AttemptRepository for InMemoryStore {
    async fn insert_attempt(&self, attempt: &PaymentAttempt) -> BillingResult<()> {
        self.attempts.write().await.push(attempt.clone());
        Ok(())
    }

    async fn get_attempt(&self, id: Uuid) -> BillingResult<Option<PaymentAttempt>> {
        Ok(self
            .attempts
            .read()
            .await
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn update_attempt(&self, attempt: &PaymentAttempt) -> BillingResult<()> {
        let mut attempts = self.attempts.write().await;
        match attempts.iter_mut().find(|a| a.id == attempt.id) {
            Some(stored) => {
                *stored = attempt.clone();
                Ok(())
            }
            None => Err(BillingError::NotFound(format!(
                "payment attempt {}",
                attempt.id
            ))),
        }
    }

    async fn latest_attempt(&self, booking_id: Uuid) -> BillingResult<Option<PaymentAttempt>> {
        Ok(self
            .attempts
            .read()
            .await
            .iter()
            .rev()
            .find(|a| a.booking_id == booking_id)
            .cloned())
    }
}
