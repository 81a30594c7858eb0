pub mod app_config;
pub mod memory;
pub mod notifier;
pub mod repository;
pub mod service;

pub use app_config::{BillingRules, EngineConfig};
pub use memory::InMemoryStore;
pub use notifier::ChangeNotifier;
pub use repository::{
    AttemptRepository, BookingRepository, LedgerRepository, ReceivableRepository,
};
pub use service::{BillingSummary, ChargeOutcome, ReconciliationService};
