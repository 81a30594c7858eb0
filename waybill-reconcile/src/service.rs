use crate::app_config::BillingRules;
use crate::notifier::ChangeNotifier;
use crate::repository::{
    AttemptRepository, BookingRepository, LedgerRepository, ReceivableRepository,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;
use waybill_billing::{
    AgingBucket, MarkupQuote, PaymentAttempt, PaymentMethod, PaymentState, PaymentStateMachine,
    PaymentView, PricingAdvisor, Receivable, ReceivableCalculator,
};
use waybill_core::booking::Booking;
use waybill_core::events::{ChangeNotification, ResourceKind};
use waybill_core::{BillingError, BillingResult};
use waybill_ledger::{Charge, ChargeLedger, ChargeSlot};

/// The one authoritative read-side computation. Display surfaces consume
/// this instead of re-deriving totals, aging or paid status with their
/// own formulas.
#[derive(Debug, Clone, Serialize)]
pub struct BillingSummary {
    pub booking_id: Uuid,
    pub total_expenses: i64,
    pub unpaid_expenses: i64,
    pub unpaid_charge_count: usize,
    pub total_payment: Option<i64>,
    pub amount_collected: i64,
    pub collectible_amount: i64,
    pub profit: Option<i64>,
    pub profit_margin: Option<f64>,
    pub due_date: Option<NaiveDate>,
    pub is_overdue: bool,
    pub aging: Option<AgingBucket>,
    pub state: PaymentState,
    pub view: Option<PaymentView>,
}

/// Per-item result of a bulk charge settlement. Charges are independent
/// resources, so a failed item never rolls back the ones already marked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeOutcome {
    pub slot: ChargeSlot,
    pub succeeded: bool,
    pub error: Option<String>,
}

impl ChargeOutcome {
    fn ok(slot: ChargeSlot) -> Self {
        Self {
            slot,
            succeeded: true,
            error: None,
        }
    }

    fn failed(slot: ChargeSlot, error: &BillingError) -> Self {
        Self {
            slot,
            succeeded: false,
            error: Some(error.to_string()),
        }
    }
}

/// Façade over the charge ledger, receivable calculator and payment state
/// machine. Every mutation the back office performs on billing data goes
/// through here, and every successful one emits a change notification.
pub struct ReconciliationService {
    bookings: Arc<dyn BookingRepository>,
    ledgers: Arc<dyn LedgerRepository>,
    receivables: Arc<dyn ReceivableRepository>,
    attempts: Arc<dyn AttemptRepository>,
    advisor: PricingAdvisor,
    rules: BillingRules,
    notifier: ChangeNotifier,
}

impl ReconciliationService {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        ledgers: Arc<dyn LedgerRepository>,
        receivables: Arc<dyn ReceivableRepository>,
        attempts: Arc<dyn AttemptRepository>,
        rules: BillingRules,
    ) -> Self {
        let advisor = PricingAdvisor::new(rules.markup_config());
        Self {
            bookings,
            ledgers,
            receivables,
            attempts,
            advisor,
            rules,
            notifier: ChangeNotifier::default(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotification> {
        self.notifier.subscribe()
    }

    /// Record a vendor charge, then keep the receivable's expense total in
    /// sync. The receivable is created lazily once a ledger total exists.
    pub async fn record_charge(&self, booking_id: Uuid, charge: Charge) -> BillingResult<()> {
        // Surface unknown bookings before mutating anything
        self.bookings.get_booking(booking_id).await?;

        let mut ledger = self
            .ledgers
            .get_ledger(booking_id)
            .await?
            .unwrap_or_else(|| ChargeLedger::new(booking_id));
        ledger.add_charge(charge)?;
        self.ledgers.save_ledger(&ledger).await?;
        self.notifier.emit(booking_id, ResourceKind::Charges);

        self.refresh_receivable_expenses(booking_id, &ledger).await?;
        info!(
            "Recorded charge on booking {}; total expenses now {}",
            booking_id,
            ledger.total_expenses()
        );
        Ok(())
    }

    /// Remove a charge. Removing an absent charge is a no-op, mirroring
    /// the ledger contract.
    pub async fn remove_charge(&self, booking_id: Uuid, slot: ChargeSlot) -> BillingResult<bool> {
        let mut ledger = match self.ledgers.get_ledger(booking_id).await? {
            Some(ledger) => ledger,
            None => return Ok(false),
        };
        let removed = ledger.remove_charge(slot);
        if removed {
            self.ledgers.save_ledger(&ledger).await?;
            self.notifier.emit(booking_id, ResourceKind::Charges);
            self.refresh_receivable_expenses(booking_id, &ledger).await?;
        }
        Ok(removed)
    }

    /// Settle one vendor charge. Idempotent, so a client may retry after
    /// a timeout without knowing whether the first attempt landed.
    pub async fn mark_charge_paid(
        &self,
        booking_id: Uuid,
        slot: ChargeSlot,
        voucher: Option<String>,
        check_date: Option<NaiveDate>,
    ) -> BillingResult<()> {
        let mut ledger = self.require_ledger(booking_id).await?;
        ledger.set_paid(slot, true, voucher, check_date)?;
        self.ledgers.save_ledger(&ledger).await?;
        self.notifier.emit(booking_id, ResourceKind::Charges);
        Ok(())
    }

    /// Bulk settlement, applied sequentially with no rollback. Reports a
    /// per-slot outcome list rather than a single boolean.
    pub async fn mark_charges_paid(
        &self,
        booking_id: Uuid,
        slots: &[ChargeSlot],
        voucher: Option<String>,
        check_date: Option<NaiveDate>,
    ) -> BillingResult<Vec<ChargeOutcome>> {
        let mut ledger = self.require_ledger(booking_id).await?;
        let mut outcomes = Vec::with_capacity(slots.len());

        for &slot in slots {
            match ledger.set_paid(slot, true, voucher.clone(), check_date) {
                // Persist after each item: charges already marked stay
                // marked even if a later one fails
                Ok(()) => match self.ledgers.save_ledger(&ledger).await {
                    Ok(()) => outcomes.push(ChargeOutcome::ok(slot)),
                    Err(err) => {
                        warn!(
                            "Failed to persist paid status for {} {} on booking {}: {}",
                            slot.kind_label(),
                            slot.subtype_label(),
                            booking_id,
                            err
                        );
                        outcomes.push(ChargeOutcome::failed(slot, &err));
                    }
                },
                Err(err) => outcomes.push(ChargeOutcome::failed(slot, &err)),
            }
        }

        if outcomes.iter().any(|o| o.succeeded) {
            self.notifier.emit(booking_id, ResourceKind::Charges);
        }
        Ok(outcomes)
    }

    /// Markup quotes for the billing form, one per configured preset.
    pub async fn pricing_quotes(&self, booking_id: Uuid) -> BillingResult<Vec<MarkupQuote>> {
        let total = self.total_expenses(booking_id).await?;
        Ok(self.advisor.quotes(total))
    }

    /// Suggested billed amount at the default markup ratio.
    pub async fn suggested_payment(&self, booking_id: Uuid) -> BillingResult<i64> {
        let total = self.total_expenses(booking_id).await?;
        Ok(self.advisor.suggest_default(total))
    }

    /// Staff bills the customer for a booking.
    pub async fn send_payment(&self, booking_id: Uuid, total_payment: i64) -> BillingResult<()> {
        let booking = self.bookings.get_booking(booking_id).await?;
        let total_expenses = self.total_expenses(booking_id).await?;
        let mut receivable = self
            .receivables
            .get_receivable(booking_id)
            .await?
            .unwrap_or_else(|| Receivable::new(booking_id, total_expenses));
        let latest = self.attempts.latest_attempt(booking_id).await?;

        let due_date = self.due_date_for(&booking);
        PaymentStateMachine::send_payment(
            &mut receivable,
            total_payment,
            due_date,
            latest.as_ref(),
        )?;
        self.receivables.save_receivable(&receivable).await?;
        self.notifier.emit(booking_id, ResourceKind::Receivable);
        info!(
            "Payment request of {} sent for booking {}",
            total_payment, booking_id
        );
        Ok(())
    }

    /// Customer submits a settlement. GCash requires proof and creates a
    /// pending attempt; COD records the method and moves no money.
    pub async fn submit_customer_payment(
        &self,
        booking_id: Uuid,
        method: PaymentMethod,
        amount: i64,
        reference_number: Option<String>,
        receipt_image: Option<String>,
    ) -> BillingResult<Option<PaymentAttempt>> {
        if amount <= 0 {
            return Err(BillingError::InvalidAmount(amount));
        }
        let mut receivable = self
            .receivables
            .get_receivable(booking_id)
            .await?
            .ok_or_else(|| {
                BillingError::NotFound(format!("receivable for booking {}", booking_id))
            })?;
        let latest = self.attempts.latest_attempt(booking_id).await?;

        // Build the attempt first so proof validation fails before any
        // state moves
        let attempt = match method {
            PaymentMethod::Gcash => Some(PaymentAttempt::new(
                booking_id,
                method,
                amount,
                reference_number,
                receipt_image,
            )?),
            PaymentMethod::Cod => None,
        };

        PaymentStateMachine::accept_submission(&mut receivable, method, latest.as_ref())?;

        if let Some(ref attempt) = attempt {
            self.attempts.insert_attempt(attempt).await?;
            self.notifier.emit(booking_id, ResourceKind::PaymentAttempts);
        }
        self.receivables.save_receivable(&receivable).await?;
        self.notifier.emit(booking_id, ResourceKind::Receivable);
        info!(
            "Customer payment of {} submitted for booking {} via {:?}",
            amount, booking_id, method
        );
        Ok(attempt)
    }

    /// Staff verdict on a pending GCash attempt.
    pub async fn verify_payment(
        &self,
        attempt_id: Uuid,
        approve: bool,
        notes: Option<String>,
    ) -> BillingResult<PaymentAttempt> {
        let mut attempt = self
            .attempts
            .get_attempt(attempt_id)
            .await?
            .ok_or_else(|| BillingError::NotFound(format!("payment attempt {}", attempt_id)))?;
        let booking_id = attempt.booking_id;
        let mut receivable = self
            .receivables
            .get_receivable(booking_id)
            .await?
            .ok_or_else(|| {
                BillingError::NotFound(format!("receivable for booking {}", booking_id))
            })?;

        PaymentStateMachine::verify_attempt(&mut receivable, &mut attempt, approve, notes)?;

        self.attempts.update_attempt(&attempt).await?;
        self.receivables.save_receivable(&receivable).await?;
        self.notifier.emit(booking_id, ResourceKind::PaymentAttempts);
        self.notifier.emit(booking_id, ResourceKind::Receivable);
        if approve {
            info!(
                "Verified payment attempt {} for booking {}; collected {} of {:?}",
                attempt_id, booking_id, receivable.amount_collected, receivable.total_payment
            );
        } else {
            warn!(
                "Rejected payment attempt {} for booking {}",
                attempt_id, booking_id
            );
        }
        Ok(attempt)
    }

    /// Cash collected at delivery; settles the COD receivable in full.
    pub async fn mark_cod_collected(&self, booking_id: Uuid) -> BillingResult<()> {
        let mut receivable = self
            .receivables
            .get_receivable(booking_id)
            .await?
            .ok_or_else(|| {
                BillingError::NotFound(format!("receivable for booking {}", booking_id))
            })?;
        let latest = self.attempts.latest_attempt(booking_id).await?;

        PaymentStateMachine::mark_cod_collected(&mut receivable, latest.as_ref())?;
        self.receivables.save_receivable(&receivable).await?;
        self.notifier.emit(booking_id, ResourceKind::Receivable);
        info!("COD collected for booking {}", booking_id);
        Ok(())
    }

    /// The authoritative derived view of a booking's billing position.
    pub async fn billing_summary(&self, booking_id: Uuid) -> BillingResult<BillingSummary> {
        let booking = self.bookings.get_booking(booking_id).await?;
        let ledger = self.ledgers.get_ledger(booking_id).await?;
        let receivable = self.receivables.get_receivable(booking_id).await?;
        let latest = self.attempts.latest_attempt(booking_id).await?;

        let (total_expenses, unpaid_expenses, unpaid_charge_count) = ledger
            .as_ref()
            .map(|l| (l.total_expenses(), l.unpaid_total(), l.unpaid_count()))
            .unwrap_or((0, 0, 0));

        let today = Utc::now().date_naive();
        let due_date = receivable
            .as_ref()
            .and_then(|r| r.due_date)
            .or_else(|| self.due_date_for(&booking));

        let total_payment = receivable.as_ref().and_then(|r| r.total_payment);
        let amount_collected = receivable.as_ref().map(|r| r.amount_collected).unwrap_or(0);
        let collectible_amount = receivable
            .as_ref()
            .map(|r| r.collectible_amount())
            .unwrap_or(0);
        let is_paid = receivable.as_ref().map(|r| r.is_paid).unwrap_or(false);

        Ok(BillingSummary {
            booking_id,
            total_expenses,
            unpaid_expenses,
            unpaid_charge_count,
            total_payment,
            amount_collected,
            collectible_amount,
            profit: total_payment.map(|tp| ReceivableCalculator::profit(tp, total_expenses)),
            profit_margin: total_payment
                .and_then(|tp| ReceivableCalculator::profit_margin(tp, total_expenses)),
            due_date,
            is_overdue: !is_paid && ReceivableCalculator::is_overdue(due_date, today),
            aging: if is_paid {
                None
            } else {
                ReceivableCalculator::aging_bucket(due_date, today)
            },
            state: PaymentStateMachine::derive(receivable.as_ref(), latest.as_ref()),
            view: receivable
                .as_ref()
                .map(|r| PaymentView::derive(r, latest.as_ref())),
        })
    }

    async fn total_expenses(&self, booking_id: Uuid) -> BillingResult<i64> {
        Ok(self
            .ledgers
            .get_ledger(booking_id)
            .await?
            .map(|l| l.total_expenses())
            .unwrap_or(0))
    }

    async fn require_ledger(&self, booking_id: Uuid) -> BillingResult<ChargeLedger> {
        self.ledgers.get_ledger(booking_id).await?.ok_or_else(|| {
            BillingError::NotFound(format!("charge ledger for booking {}", booking_id))
        })
    }

    async fn refresh_receivable_expenses(
        &self,
        booking_id: Uuid,
        ledger: &ChargeLedger,
    ) -> BillingResult<()> {
        match self.receivables.get_receivable(booking_id).await? {
            Some(mut receivable) => {
                receivable.refresh_expenses(ledger.total_expenses());
                self.receivables.save_receivable(&receivable).await?;
                self.notifier.emit(booking_id, ResourceKind::Receivable);
            }
            None if ledger.total_expenses() > 0 => {
                let receivable = Receivable::new(booking_id, ledger.total_expenses());
                self.receivables.save_receivable(&receivable).await?;
                self.notifier.emit(booking_id, ResourceKind::Receivable);
            }
            None => {}
        }
        Ok(())
    }

    fn due_date_for(&self, booking: &Booking) -> Option<NaiveDate> {
        let mut effective = booking.clone();
        if effective.terms_days <= 0 {
            effective.terms_days = self.rules.default_terms_days;
        }
        ReceivableCalculator::due_date(&effective)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use waybill_ledger::{MiscChargeType, PortChargeType, TruckingLeg};

    async fn harness() -> (ReconciliationService, Uuid) {
        let store = Arc::new(InMemoryStore::new());
        let service = ReconciliationService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            BillingRules::default(),
        );
        let booking = Booking::new(30);
        let booking_id = booking.id;
        store.seed_booking(booking).await;
        (service, booking_id)
    }

    fn charge(slot: ChargeSlot, amount: i64) -> Charge {
        Charge::new(slot, amount).unwrap()
    }

    async fn record_standard_charges(service: &ReconciliationService, booking_id: Uuid) {
        service
            .record_charge(booking_id, charge(ChargeSlot::Freight, 5000))
            .await
            .unwrap();
        service
            .record_charge(
                booking_id,
                charge(ChargeSlot::Trucking(TruckingLeg::Origin), 1000),
            )
            .await
            .unwrap();
        service
            .record_charge(
                booking_id,
                charge(ChargeSlot::Trucking(TruckingLeg::Destination), 800),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn charges_build_the_expense_total_and_ready_the_receivable() {
        let (service, booking_id) = harness().await;
        record_standard_charges(&service, booking_id).await;

        let summary = service.billing_summary(booking_id).await.unwrap();
        assert_eq!(summary.total_expenses, 6800);
        assert_eq!(summary.unpaid_expenses, 6800);
        assert_eq!(summary.unpaid_charge_count, 3);
        assert_eq!(summary.state, PaymentState::ReadyForPayment);
        assert_eq!(summary.total_payment, None);
        assert_eq!(summary.collectible_amount, 0);
    }

    #[tokio::test]
    async fn suggested_payment_applies_the_default_markup() {
        let (service, booking_id) = harness().await;
        record_standard_charges(&service, booking_id).await;

        assert_eq!(service.suggested_payment(booking_id).await.unwrap(), 8840);

        let quotes = service.pricing_quotes(booking_id).await.unwrap();
        assert_eq!(quotes.len(), 3);
        assert_eq!(quotes[1].suggested, 8840);
    }

    #[tokio::test]
    async fn gcash_lifecycle_settles_only_after_verification() {
        let (service, booking_id) = harness().await;
        record_standard_charges(&service, booking_id).await;

        service.send_payment(booking_id, 8840).await.unwrap();
        let summary = service.billing_summary(booking_id).await.unwrap();
        assert_eq!(summary.state, PaymentState::PaymentSent);
        assert_eq!(summary.collectible_amount, 8840);

        let attempt = service
            .submit_customer_payment(
                booking_id,
                PaymentMethod::Gcash,
                8840,
                Some("GC-2024-778".to_string()),
                Some("receipt.jpg".to_string()),
            )
            .await
            .unwrap()
            .expect("gcash submission creates an attempt");

        let summary = service.billing_summary(booking_id).await.unwrap();
        assert_eq!(summary.state, PaymentState::GcashPendingVerification);
        // Unchanged until staff verifies
        assert_eq!(summary.collectible_amount, 8840);
        assert!(summary.view.unwrap().is_gcash_pending_verification);

        service.verify_payment(attempt.id, true, None).await.unwrap();

        let summary = service.billing_summary(booking_id).await.unwrap();
        assert_eq!(summary.state, PaymentState::Paid);
        assert_eq!(summary.collectible_amount, 0);
        assert_eq!(summary.amount_collected, 8840);
        assert_eq!(summary.profit, Some(2040));
        assert!(summary.view.unwrap().is_fully_paid);
    }

    #[tokio::test]
    async fn cod_lifecycle_keeps_collectible_until_delivery() {
        let (service, booking_id) = harness().await;
        service
            .record_charge(booking_id, charge(ChargeSlot::Freight, 4000))
            .await
            .unwrap();
        service.send_payment(booking_id, 5000).await.unwrap();

        let attempt = service
            .submit_customer_payment(booking_id, PaymentMethod::Cod, 5000, None, None)
            .await
            .unwrap();
        assert!(attempt.is_none(), "COD moves no money and records no attempt");

        let summary = service.billing_summary(booking_id).await.unwrap();
        assert_eq!(summary.state, PaymentState::CodPending);
        // Not zero: nothing has been collected yet
        assert_eq!(summary.collectible_amount, 5000);
        assert!(summary.view.unwrap().is_cod_pending);

        service.mark_cod_collected(booking_id).await.unwrap();
        let summary = service.billing_summary(booking_id).await.unwrap();
        assert_eq!(summary.state, PaymentState::Paid);
        assert_eq!(summary.collectible_amount, 0);
    }

    #[tokio::test]
    async fn gcash_without_receipt_fails_before_any_state_change() {
        let (service, booking_id) = harness().await;
        service
            .record_charge(booking_id, charge(ChargeSlot::Freight, 4000))
            .await
            .unwrap();
        service.send_payment(booking_id, 5200).await.unwrap();

        let result = service
            .submit_customer_payment(booking_id, PaymentMethod::Gcash, 5200, None, None)
            .await;
        assert!(matches!(result, Err(BillingError::MissingReceipt)));

        let summary = service.billing_summary(booking_id).await.unwrap();
        assert_eq!(summary.state, PaymentState::PaymentSent);
    }

    #[tokio::test]
    async fn settled_receivables_accept_no_further_payments() {
        let (service, booking_id) = harness().await;
        service
            .record_charge(booking_id, charge(ChargeSlot::Freight, 4000))
            .await
            .unwrap();
        service.send_payment(booking_id, 5000).await.unwrap();
        service
            .submit_customer_payment(booking_id, PaymentMethod::Cod, 5000, None, None)
            .await
            .unwrap();
        service.mark_cod_collected(booking_id).await.unwrap();

        let result = service
            .submit_customer_payment(
                booking_id,
                PaymentMethod::Gcash,
                5000,
                None,
                Some("late.jpg".to_string()),
            )
            .await;
        assert!(matches!(result, Err(BillingError::AlreadyPaid(_))));
    }

    #[tokio::test]
    async fn rejected_attempt_allows_resubmission() {
        let (service, booking_id) = harness().await;
        service
            .record_charge(booking_id, charge(ChargeSlot::Freight, 4000))
            .await
            .unwrap();
        service.send_payment(booking_id, 5200).await.unwrap();

        let attempt = service
            .submit_customer_payment(
                booking_id,
                PaymentMethod::Gcash,
                5200,
                None,
                Some("blurry.jpg".to_string()),
            )
            .await
            .unwrap()
            .unwrap();

        let rejected = service
            .verify_payment(attempt.id, false, Some("receipt unreadable".to_string()))
            .await
            .unwrap();
        assert_eq!(rejected.admin_notes.as_deref(), Some("receipt unreadable"));

        let summary = service.billing_summary(booking_id).await.unwrap();
        assert_eq!(summary.state, PaymentState::Rejected);
        assert_eq!(summary.collectible_amount, 5200);

        // Customer resubmits with a readable receipt
        let retry = service
            .submit_customer_payment(
                booking_id,
                PaymentMethod::Gcash,
                5200,
                None,
                Some("clear.jpg".to_string()),
            )
            .await
            .unwrap()
            .unwrap();
        service.verify_payment(retry.id, true, None).await.unwrap();

        let summary = service.billing_summary(booking_id).await.unwrap();
        assert_eq!(summary.state, PaymentState::Paid);
    }

    #[tokio::test]
    async fn bulk_settlement_reports_per_item_outcomes_and_is_retryable() {
        let (service, booking_id) = harness().await;
        record_standard_charges(&service, booking_id).await;

        let slots = [
            ChargeSlot::Freight,
            ChargeSlot::Port(PortChargeType::Storage), // never recorded
            ChargeSlot::Trucking(TruckingLeg::Origin),
        ];
        let outcomes = service
            .mark_charges_paid(booking_id, &slots, Some("V-3001".to_string()), None)
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].succeeded);
        assert!(!outcomes[1].succeeded);
        assert!(outcomes[1].error.as_deref().unwrap().contains("Not found"));
        assert!(outcomes[2].succeeded);

        // Partial failure left the applied charges marked
        let summary = service.billing_summary(booking_id).await.unwrap();
        assert_eq!(summary.unpaid_expenses, 800);
        assert_eq!(summary.unpaid_charge_count, 1);

        // A client retry after a timeout re-applies safely
        let retry = service
            .mark_charges_paid(booking_id, &slots, None, None)
            .await
            .unwrap();
        assert!(retry[0].succeeded);
        assert_eq!(
            service
                .billing_summary(booking_id)
                .await
                .unwrap()
                .unpaid_expenses,
            800
        );
    }

    #[tokio::test]
    async fn duplicate_charge_subtype_is_reported_with_its_identity() {
        let (service, booking_id) = harness().await;
        service
            .record_charge(
                booking_id,
                charge(ChargeSlot::Misc(MiscChargeType::Documentation), 200),
            )
            .await
            .unwrap();

        let result = service
            .record_charge(
                booking_id,
                charge(ChargeSlot::Misc(MiscChargeType::Documentation), 300),
            )
            .await;
        match result {
            Err(BillingError::DuplicateSubtype { kind, subtype }) => {
                assert_eq!(kind, "MISC");
                assert_eq!(subtype, "DOCUMENTATION");
            }
            other => panic!("expected duplicate subtype error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn operations_on_unknown_bookings_fail_with_not_found() {
        let (service, _) = harness().await;
        let unknown = Uuid::new_v4();

        let result = service
            .record_charge(unknown, charge(ChargeSlot::Freight, 100))
            .await;
        assert!(matches!(result, Err(BillingError::NotFound(_))));

        let result = service.send_payment(unknown, 100).await;
        assert!(matches!(result, Err(BillingError::NotFound(_))));
    }

    #[tokio::test]
    async fn send_payment_rejects_non_positive_amounts() {
        let (service, booking_id) = harness().await;
        record_standard_charges(&service, booking_id).await;

        let result = service.send_payment(booking_id, 0).await;
        assert!(matches!(result, Err(BillingError::InvalidAmount(0))));
        let result = service.send_payment(booking_id, -500).await;
        assert!(matches!(result, Err(BillingError::InvalidAmount(-500))));
    }

    #[tokio::test]
    async fn rebilling_after_partial_settlement_keeps_the_collected_cap() {
        let (service, booking_id) = harness().await;
        record_standard_charges(&service, booking_id).await;
        service.send_payment(booking_id, 8840).await.unwrap();

        let attempt = service
            .submit_customer_payment(
                booking_id,
                PaymentMethod::Gcash,
                5000,
                None,
                Some("part1.jpg".to_string()),
            )
            .await
            .unwrap()
            .unwrap();
        service.verify_payment(attempt.id, true, None).await.unwrap();

        let summary = service.billing_summary(booking_id).await.unwrap();
        assert_eq!(summary.amount_collected, 5000);
        assert_eq!(summary.state, PaymentState::PaymentSent);

        // Staff cannot re-bill below what has already been collected
        let rebill = service.send_payment(booking_id, 3000).await;
        assert!(matches!(rebill, Err(BillingError::InvalidAmount(3000))));

        let summary = service.billing_summary(booking_id).await.unwrap();
        assert_eq!(summary.total_payment, Some(8840));
        assert!(summary.amount_collected <= summary.total_payment.unwrap());
    }

    #[tokio::test]
    async fn mutations_emit_change_notifications() {
        let (service, booking_id) = harness().await;
        let mut rx = service.subscribe();

        service
            .record_charge(booking_id, charge(ChargeSlot::Freight, 5000))
            .await
            .unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.booking_id, booking_id);
        assert_eq!(first.resource, ResourceKind::Charges);

        // Receivable creation follows the first charge
        let second = rx.recv().await.unwrap();
        assert_eq!(second.resource, ResourceKind::Receivable);
    }

    #[tokio::test]
    async fn summary_serializes_for_display_surfaces() {
        let (service, booking_id) = harness().await;
        record_standard_charges(&service, booking_id).await;

        let summary = service.billing_summary(booking_id).await.unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["total_expenses"], 6800);
        assert_eq!(json["state"], "READY_FOR_PAYMENT");
        assert!(json["total_payment"].is_null());
    }

    #[tokio::test]
    async fn removing_a_charge_refreshes_the_receivable_total() {
        let (service, booking_id) = harness().await;
        record_standard_charges(&service, booking_id).await;

        let removed = service
            .remove_charge(booking_id, ChargeSlot::Trucking(TruckingLeg::Destination))
            .await
            .unwrap();
        assert!(removed);

        let summary = service.billing_summary(booking_id).await.unwrap();
        assert_eq!(summary.total_expenses, 6000);

        // Absent slot is a no-op
        let removed = service
            .remove_charge(booking_id, ChargeSlot::Port(PortChargeType::Arrastre))
            .await
            .unwrap();
        assert!(!removed);
    }

    #[tokio::test]
    async fn due_date_and_aging_come_from_the_booking_terms() {
        let store = Arc::new(InMemoryStore::new());
        let service = ReconciliationService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            BillingRules::default(),
        );
        let mut booking = Booking::new(30);
        // Delivered long enough ago that the receivable has aged past due
        booking.actual_delivery_date =
            Some(Utc::now().date_naive() - chrono::Duration::days(75));
        let booking_id = booking.id;
        store.seed_booking(booking).await;

        service
            .record_charge(booking_id, charge(ChargeSlot::Freight, 4000))
            .await
            .unwrap();
        service.send_payment(booking_id, 5000).await.unwrap();

        let summary = service.billing_summary(booking_id).await.unwrap();
        assert!(summary.is_overdue);
        assert_eq!(summary.aging, Some(AgingBucket::Days31To60));

        // No delivery date at all: no due date, no bucket, never overdue
        let undated = Booking::new(30);
        let undated_id = undated.id;
        store.seed_booking(undated).await;
        service
            .record_charge(undated_id, charge(ChargeSlot::Freight, 1000))
            .await
            .unwrap();
        let summary = service.billing_summary(undated_id).await.unwrap();
        assert_eq!(summary.due_date, None);
        assert_eq!(summary.aging, None);
        assert!(!summary.is_overdue);
    }
}
