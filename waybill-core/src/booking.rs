use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Booking fields the engine consumes. Read-only here: booking CRUD lives
/// in the surrounding back office, this crate only derives billing figures
/// from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    /// Payment terms in days, counted from the delivery date.
    pub terms_days: i64,
    pub preferred_delivery_date: Option<NaiveDate>,
    /// Set by cargo tracking once the shipment is marked delivered.
    pub actual_delivery_date: Option<NaiveDate>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    InTransit,
    Delivered,
    Cancelled,
}

impl Booking {
    pub fn new(terms_days: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            terms_days,
            preferred_delivery_date: None,
            actual_delivery_date: None,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// The date the payment clock runs from: the actual delivery date once
    /// cargo tracking has one, otherwise the preferred date. `None` when
    /// neither is known yet.
    pub fn delivery_basis(&self) -> Option<NaiveDate> {
        self.actual_delivery_date.or(self.preferred_delivery_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actual_delivery_date_wins_over_preferred() {
        let mut booking = Booking::new(30);
        assert_eq!(booking.delivery_basis(), None);

        let preferred = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        booking.preferred_delivery_date = Some(preferred);
        assert_eq!(booking.delivery_basis(), Some(preferred));

        let actual = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        booking.actual_delivery_date = Some(actual);
        assert_eq!(booking.delivery_basis(), Some(actual));
    }
}
