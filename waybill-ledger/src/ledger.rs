use crate::models::{Charge, ChargeSlot};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;
use waybill_core::{BillingError, BillingResult};

/// Accounts Payable for one booking: the freight charge plus ordered
/// trucking, port and misc charges. Created when the first charge is
/// recorded; never deleted, only emptied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeLedger {
    pub booking_id: Uuid,
    pub freight: Option<Charge>,
    pub trucking: Vec<Charge>,
    pub port: Vec<Charge>,
    pub misc: Vec<Charge>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChargeLedger {
    pub fn new(booking_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            booking_id,
            freight: None,
            trucking: Vec::new(),
            port: Vec::new(),
            misc: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a ledger from an externally synced charge list. The backend
    /// has historically permitted duplicate subtypes, so the raw list is
    /// deduplicated first.
    pub fn rehydrate(booking_id: Uuid, raw: Vec<Charge>) -> Self {
        let mut ledger = Self::new(booking_id);
        for charge in Self::dedupe(raw) {
            match charge.slot {
                ChargeSlot::Freight => ledger.freight = Some(charge),
                ChargeSlot::Trucking(_) => ledger.trucking.push(charge),
                ChargeSlot::Port(_) => ledger.port.push(charge),
                ChargeSlot::Misc(_) => ledger.misc.push(charge),
            }
        }
        ledger
    }

    /// Retain only the first charge per (kind, subtype) slot. Idempotent:
    /// applying it to an already-clean list is a no-op.
    pub fn dedupe(raw: Vec<Charge>) -> Vec<Charge> {
        let mut seen: HashSet<ChargeSlot> = HashSet::new();
        raw.into_iter()
            .filter(|charge| seen.insert(charge.slot))
            .collect()
    }

    /// Record a charge. Trucking/port/misc slots reject duplicates;
    /// freight is a singleton, so a second freight charge replaces the
    /// existing one.
    pub fn add_charge(&mut self, charge: Charge) -> BillingResult<()> {
        match charge.slot {
            ChargeSlot::Freight => {
                self.freight = Some(charge);
            }
            _ => {
                if self.find(charge.slot).is_some() {
                    return Err(BillingError::DuplicateSubtype {
                        kind: charge.slot.kind_label(),
                        subtype: charge.slot.subtype_label(),
                    });
                }
                match charge.slot {
                    ChargeSlot::Trucking(_) => self.trucking.push(charge),
                    ChargeSlot::Port(_) => self.port.push(charge),
                    ChargeSlot::Misc(_) => self.misc.push(charge),
                    ChargeSlot::Freight => unreachable!(),
                }
            }
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Remove the charge in a slot. Returns whether anything was removed;
    /// removing an absent slot is a no-op, not an error.
    pub fn remove_charge(&mut self, slot: ChargeSlot) -> bool {
        let removed = match slot {
            ChargeSlot::Freight => self.freight.take().is_some(),
            ChargeSlot::Trucking(_) => Self::remove_from(&mut self.trucking, slot),
            ChargeSlot::Port(_) => Self::remove_from(&mut self.port, slot),
            ChargeSlot::Misc(_) => Self::remove_from(&mut self.misc, slot),
        };
        if removed {
            self.updated_at = Utc::now();
        }
        removed
    }

    /// Toggle vendor settlement on one charge. Does not change
    /// `total_expenses`; only the unpaid subset moves.
    pub fn set_paid(
        &mut self,
        slot: ChargeSlot,
        paid: bool,
        voucher: Option<String>,
        check_date: Option<NaiveDate>,
    ) -> BillingResult<()> {
        let booking_id = self.booking_id;
        let charge = self.find_mut(slot).ok_or_else(|| {
            BillingError::NotFound(format!(
                "charge {} {} on booking {}",
                slot.kind_label(),
                slot.subtype_label(),
                booking_id
            ))
        })?;
        charge.set_paid(paid, voucher, check_date);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Sum of all charge amounts, paid or not. This is the figure the
    /// receivable bills against.
    pub fn total_expenses(&self) -> i64 {
        self.charges().map(|c| c.amount).sum()
    }

    /// Sum restricted to charges not yet settled with the vendor.
    pub fn unpaid_total(&self) -> i64 {
        self.charges().filter(|c| !c.is_paid).map(|c| c.amount).sum()
    }

    pub fn unpaid_count(&self) -> usize {
        self.charges().filter(|c| !c.is_paid).count()
    }

    /// All charges in stable order: freight, trucking, port, misc.
    pub fn charges(&self) -> impl Iterator<Item = &Charge> {
        self.freight
            .iter()
            .chain(self.trucking.iter())
            .chain(self.port.iter())
            .chain(self.misc.iter())
    }

    pub fn find(&self, slot: ChargeSlot) -> Option<&Charge> {
        self.charges().find(|c| c.slot == slot)
    }

    fn find_mut(&mut self, slot: ChargeSlot) -> Option<&mut Charge> {
        match slot {
            ChargeSlot::Freight => self.freight.as_mut().filter(|c| c.slot == slot),
            ChargeSlot::Trucking(_) => self.trucking.iter_mut().find(|c| c.slot == slot),
            ChargeSlot::Port(_) => self.port.iter_mut().find(|c| c.slot == slot),
            ChargeSlot::Misc(_) => self.misc.iter_mut().find(|c| c.slot == slot),
        }
    }

    fn remove_from(charges: &mut Vec<Charge>, slot: ChargeSlot) -> bool {
        let before = charges.len();
        charges.retain(|c| c.slot != slot);
        charges.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.charges().next().is_none()
    }

    /// Empty the ledger. The ledger itself survives for the lifetime of
    /// its booking.
    pub fn clear(&mut self) {
        self.freight = None;
        self.trucking.clear();
        self.port.clear();
        self.misc.clear();
        self.updated_at = Utc::now();
    }
}
