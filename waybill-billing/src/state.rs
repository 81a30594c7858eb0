use crate::models::{AttemptStatus, PaymentAttempt, PaymentMethod, Receivable};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use waybill_core::{BillingError, BillingResult};

/// Payment lifecycle state. Always derived from the stored receivable and
/// its latest attempt, never persisted, so there is exactly one definition
/// of each state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentState {
    NoCharges,
    ReadyForPayment,
    PaymentSent,
    CodPending,
    GcashPendingVerification,
    Rejected,
    Paid,
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentState::NoCharges => "NO_CHARGES",
            PaymentState::ReadyForPayment => "READY_FOR_PAYMENT",
            PaymentState::PaymentSent => "PAYMENT_SENT",
            PaymentState::CodPending => "COD_PENDING",
            PaymentState::GcashPendingVerification => "GCASH_PENDING_VERIFICATION",
            PaymentState::Rejected => "REJECTED",
            PaymentState::Paid => "PAID",
        };
        write!(f, "{}", name)
    }
}

/// Display-only flags for view surfaces, computed from stored fields.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentView {
    pub is_fully_paid: bool,
    pub is_cod_pending: bool,
    pub is_gcash_pending_verification: bool,
}

impl PaymentView {
    pub fn derive(receivable: &Receivable, latest_attempt: Option<&PaymentAttempt>) -> Self {
        let collectible = receivable.collectible_amount();
        Self {
            is_fully_paid: receivable.is_paid,
            is_cod_pending: receivable.payment_method == Some(PaymentMethod::Cod)
                && !receivable.is_paid
                && collectible > 0,
            is_gcash_pending_verification: receivable.payment_method == Some(PaymentMethod::Gcash)
                && !receivable.is_paid
                && collectible > 0
                && latest_attempt.map(|a| a.status) == Some(AttemptStatus::Pending),
        }
    }
}

/// Transitions are the only way a receivable's payment fields change.
/// The source of each transition is always re-derived, so two staff
/// operating on the same booking cannot observe divergent states.
pub struct PaymentStateMachine;

impl PaymentStateMachine {
    pub fn derive(
        receivable: Option<&Receivable>,
        latest_attempt: Option<&PaymentAttempt>,
    ) -> PaymentState {
        let recv = match receivable {
            Some(recv) => recv,
            None => return PaymentState::NoCharges,
        };
        if recv.is_paid {
            return PaymentState::Paid;
        }
        if recv.total_payment.is_none() {
            return if recv.total_expenses > 0 {
                PaymentState::ReadyForPayment
            } else {
                PaymentState::NoCharges
            };
        }
        match recv.payment_method {
            Some(PaymentMethod::Cod) if recv.cod_pending => PaymentState::CodPending,
            Some(PaymentMethod::Gcash) => match latest_attempt.map(|a| a.status) {
                Some(AttemptStatus::Pending) => PaymentState::GcashPendingVerification,
                Some(AttemptStatus::Rejected) => PaymentState::Rejected,
                _ => PaymentState::PaymentSent,
            },
            _ => PaymentState::PaymentSent,
        }
    }

    /// Staff bills the customer. The collectible amount becomes the full
    /// billed amount until collections land.
    pub fn send_payment(
        receivable: &mut Receivable,
        total_payment: i64,
        due_date: Option<NaiveDate>,
        latest_attempt: Option<&PaymentAttempt>,
    ) -> BillingResult<()> {
        if total_payment <= 0 {
            return Err(BillingError::InvalidAmount(total_payment));
        }
        // Re-billing below what partial settlements already collected would
        // leave amount_collected above the billed amount
        if total_payment < receivable.amount_collected {
            return Err(BillingError::InvalidAmount(total_payment));
        }
        let state = Self::derive(Some(receivable), latest_attempt);
        match state {
            PaymentState::Paid => {
                return Err(BillingError::AlreadyPaid(receivable.booking_id.to_string()))
            }
            PaymentState::CodPending | PaymentState::GcashPendingVerification => {
                return Err(BillingError::InvalidTransition {
                    from: state.to_string(),
                    to: PaymentState::PaymentSent.to_string(),
                })
            }
            _ => {}
        }
        receivable.total_payment = Some(total_payment);
        receivable.due_date = due_date;
        receivable.touch();
        Ok(())
    }

    /// Customer picks a payment method. COD moves no money; GCash moves to
    /// verification once the attempt record exists. Valid from
    /// PAYMENT_SENT, or from REJECTED on resubmission.
    pub fn accept_submission(
        receivable: &mut Receivable,
        method: PaymentMethod,
        latest_attempt: Option<&PaymentAttempt>,
    ) -> BillingResult<()> {
        let state = Self::derive(Some(receivable), latest_attempt);
        match state {
            PaymentState::Paid => {
                return Err(BillingError::AlreadyPaid(receivable.booking_id.to_string()))
            }
            PaymentState::PaymentSent | PaymentState::Rejected => {}
            _ => {
                return Err(BillingError::InvalidTransition {
                    from: state.to_string(),
                    to: match method {
                        PaymentMethod::Cod => PaymentState::CodPending.to_string(),
                        PaymentMethod::Gcash => {
                            PaymentState::GcashPendingVerification.to_string()
                        }
                    },
                })
            }
        }
        receivable.payment_method = Some(method);
        receivable.cod_pending = method == PaymentMethod::Cod;
        receivable.touch();
        Ok(())
    }

    /// Staff verdict on a pending GCash attempt. Approval counts the funds
    /// and settles the receivable once collections reach the billed
    /// amount; rejection counts nothing and the customer may resubmit.
    pub fn verify_attempt(
        receivable: &mut Receivable,
        attempt: &mut PaymentAttempt,
        approve: bool,
        notes: Option<String>,
    ) -> BillingResult<()> {
        if attempt.status != AttemptStatus::Pending {
            return Err(BillingError::InvalidTransition {
                from: format!("{:?}", attempt.status).to_uppercase(),
                to: if approve { "VERIFIED" } else { "REJECTED" }.to_string(),
            });
        }
        if receivable.is_paid {
            return Err(BillingError::AlreadyPaid(receivable.booking_id.to_string()));
        }
        if approve {
            attempt.verify(notes);
            let billed = receivable.total_payment.unwrap_or(0);
            // Collections never exceed the billed amount
            receivable.amount_collected =
                (receivable.amount_collected + attempt.amount).min(billed);
            if receivable.amount_collected >= billed {
                receivable.is_paid = true;
            }
        } else {
            attempt.reject(notes);
        }
        receivable.touch();
        Ok(())
    }

    /// Cash collected at delivery. Settles the receivable in full.
    pub fn mark_cod_collected(
        receivable: &mut Receivable,
        latest_attempt: Option<&PaymentAttempt>,
    ) -> BillingResult<()> {
        let state = Self::derive(Some(receivable), latest_attempt);
        match state {
            PaymentState::Paid => {
                return Err(BillingError::AlreadyPaid(receivable.booking_id.to_string()))
            }
            PaymentState::CodPending => {}
            _ => {
                return Err(BillingError::InvalidTransition {
                    from: state.to_string(),
                    to: PaymentState::Paid.to_string(),
                })
            }
        }
        receivable.amount_collected = receivable.total_payment.unwrap_or(0);
        receivable.is_paid = true;
        receivable.cod_pending = false;
        receivable.touch();
        Ok(())
    }
}
