pub mod calculator;
pub mod models;
pub mod pricing;
pub mod state;

pub use calculator::{AgingBucket, ReceivableCalculator};
pub use models::{AttemptStatus, PaymentAttempt, PaymentMethod, Receivable};
pub use pricing::{MarkupConfig, MarkupQuote, PricingAdvisor};
pub use state::{PaymentState, PaymentStateMachine, PaymentView};
