use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use waybill_core::pii::Masked;
use waybill_core::{BillingError, BillingResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cod,
    Gcash,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    Pending,
    Verified,
    Rejected,
}

/// Accounts Receivable for one booking: what the customer was billed and
/// what has been collected so far. The collectible amount is always
/// computed from these fields, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receivable {
    pub booking_id: Uuid,
    /// Sum of all vendor charges, paid or not.
    pub total_expenses: i64,
    /// Amount billed to the customer. Unset until staff sends a payment
    /// request.
    pub total_payment: Option<i64>,
    /// Sum of settled (verified or COD-collected) payments.
    pub amount_collected: i64,
    pub payment_method: Option<PaymentMethod>,
    pub is_paid: bool,
    /// True while a COD amount awaits delivery-time collection.
    pub cod_pending: bool,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Receivable {
    pub fn new(booking_id: Uuid, total_expenses: i64) -> Self {
        let now = Utc::now();
        Self {
            booking_id,
            total_expenses,
            total_payment: None,
            amount_collected: 0,
            payment_method: None,
            is_paid: false,
            cod_pending: false,
            due_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// `max(0, total_payment - amount_collected)`. Zero while nothing has
    /// been billed.
    pub fn collectible_amount(&self) -> i64 {
        (self.total_payment.unwrap_or(0) - self.amount_collected).max(0)
    }

    /// Keep `total_expenses` in sync after a ledger mutation.
    pub fn refresh_expenses(&mut self, total_expenses: i64) {
        self.total_expenses = total_expenses;
        self.updated_at = Utc::now();
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// One settlement try by the customer. GCash attempts carry the receipt
/// proof that staff verifies; COD collection never creates an attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentAttempt {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub method: PaymentMethod,
    pub amount: i64,
    pub reference_number: Option<String>,
    pub receipt_image: Option<Masked<String>>,
    pub status: AttemptStatus,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentAttempt {
    pub fn new(
        booking_id: Uuid,
        method: PaymentMethod,
        amount: i64,
        reference_number: Option<String>,
        receipt_image: Option<String>,
    ) -> BillingResult<Self> {
        if amount <= 0 {
            return Err(BillingError::InvalidAmount(amount));
        }
        if method == PaymentMethod::Gcash && receipt_image.is_none() {
            return Err(BillingError::MissingReceipt);
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            booking_id,
            method,
            amount,
            reference_number,
            receipt_image: receipt_image.map(Masked),
            status: AttemptStatus::Pending,
            admin_notes: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn verify(&mut self, notes: Option<String>) {
        self.status = AttemptStatus::Verified;
        self.admin_notes = notes;
        self.updated_at = Utc::now();
    }

    pub fn reject(&mut self, notes: Option<String>) {
        self.status = AttemptStatus::Rejected;
        self.admin_notes = notes;
        self.updated_at = Utc::now();
    }
}
