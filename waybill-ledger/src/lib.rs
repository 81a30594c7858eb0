pub mod ledger;
pub mod models;

pub use ledger::ChargeLedger;
pub use models::{Charge, ChargeKind, ChargeSlot, MiscChargeType, PortChargeType, TruckingLeg};
