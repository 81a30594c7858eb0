use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use waybill_core::{BillingError, BillingResult};

/// Vendor-side charge category for one booking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargeKind {
    Freight,
    Trucking,
    Port,
    Misc,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TruckingLeg {
    Origin,
    Destination,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortChargeType {
    Arrastre,
    Wharfage,
    Storage,
    LclHandling,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MiscChargeType {
    Documentation,
    Handling,
    Insurance,
    Other,
}

/// The (kind, subtype) identity of a charge. At most one active charge per
/// slot may exist on a booking; freight has no subtype and is a singleton.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "subtype", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargeSlot {
    Freight,
    Trucking(TruckingLeg),
    Port(PortChargeType),
    Misc(MiscChargeType),
}

impl ChargeSlot {
    pub fn kind(&self) -> ChargeKind {
        match self {
            ChargeSlot::Freight => ChargeKind::Freight,
            ChargeSlot::Trucking(_) => ChargeKind::Trucking,
            ChargeSlot::Port(_) => ChargeKind::Port,
            ChargeSlot::Misc(_) => ChargeKind::Misc,
        }
    }

    /// Human-readable subtype label, used in error reporting.
    pub fn subtype_label(&self) -> String {
        match self {
            ChargeSlot::Freight => "-".to_string(),
            ChargeSlot::Trucking(leg) => format!("{:?}", leg).to_uppercase(),
            ChargeSlot::Port(t) => format!("{:?}", t).to_uppercase(),
            ChargeSlot::Misc(t) => format!("{:?}", t).to_uppercase(),
        }
    }

    pub fn kind_label(&self) -> String {
        format!("{:?}", self.kind()).to_uppercase()
    }
}

/// One vendor-side line item. Amounts are whole currency units and never
/// negative; `is_paid` tracks settlement with the vendor, not the customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Charge {
    pub slot: ChargeSlot,
    pub amount: i64,
    pub payee: Option<String>,
    pub check_date: Option<NaiveDate>,
    pub voucher: Option<String>,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Charge {
    pub fn new(slot: ChargeSlot, amount: i64) -> BillingResult<Self> {
        if amount < 0 {
            return Err(BillingError::InvalidAmount(amount));
        }
        let now = Utc::now();
        Ok(Self {
            slot,
            amount,
            payee: None,
            check_date: None,
            voucher: None,
            is_paid: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_payee(mut self, payee: impl Into<String>) -> Self {
        self.payee = Some(payee.into());
        self
    }

    /// Toggle vendor settlement. Setting "paid" twice has the same effect
    /// as once, so retries after a timeout are safe.
    pub fn set_paid(&mut self, paid: bool, voucher: Option<String>, check_date: Option<NaiveDate>) {
        self.is_paid = paid;
        if voucher.is_some() {
            self.voucher = voucher;
        }
        if check_date.is_some() {
            self.check_date = check_date;
        }
        self.updated_at = Utc::now();
    }
}
