use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use waybill_core::booking::Booking;

/// Classification of an unpaid receivable by days past due.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AgingBucket {
    #[serde(rename = "current")]
    Current,
    #[serde(rename = "1-30")]
    Days1To30,
    #[serde(rename = "31-60")]
    Days31To60,
    #[serde(rename = "61-90")]
    Days61To90,
    #[serde(rename = "over_90")]
    Over90,
}

/// Derivations from a ledger total and a billed amount. All pure: every
/// display surface must read these through one computation instead of
/// re-deriving its own variant.
pub struct ReceivableCalculator;

impl ReceivableCalculator {
    /// Due date = delivery date (actual if delivered, else preferred) plus
    /// the booking's payment terms. `None` when no delivery date is known
    /// yet; callers must treat that as "not yet determined", never as
    /// "due immediately".
    pub fn due_date(booking: &Booking) -> Option<NaiveDate> {
        booking
            .delivery_basis()
            .map(|basis| basis + Duration::days(booking.terms_days))
    }

    /// Strictly past the due date. A receivable without a due date is
    /// never overdue.
    pub fn is_overdue(due_date: Option<NaiveDate>, today: NaiveDate) -> bool {
        match due_date {
            Some(due) => today > due,
            None => false,
        }
    }

    /// `None` when there is no due date: such receivables are excluded
    /// from aging reports, not defaulted to current.
    pub fn aging_bucket(due_date: Option<NaiveDate>, today: NaiveDate) -> Option<AgingBucket> {
        let due = due_date?;
        let days_past = (today - due).num_days();
        Some(match days_past {
            i64::MIN..=0 => AgingBucket::Current,
            1..=30 => AgingBucket::Days1To30,
            31..=60 => AgingBucket::Days31To60,
            61..=90 => AgingBucket::Days61To90,
            _ => AgingBucket::Over90,
        })
    }

    pub fn collectible_amount(total_payment: i64, amount_collected: i64) -> i64 {
        (total_payment - amount_collected).max(0)
    }

    pub fn profit(total_payment: i64, total_expenses: i64) -> i64 {
        total_payment - total_expenses
    }

    /// Profit as a percentage of expenses. `None` when there are no
    /// expenses: margin is "not applicable" then, not zero.
    pub fn profit_margin(total_payment: i64, total_expenses: i64) -> Option<f64> {
        if total_expenses <= 0 {
            return None;
        }
        Some(Self::profit(total_payment, total_expenses) as f64 / total_expenses as f64 * 100.0)
    }
}
