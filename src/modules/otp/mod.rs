pub mod dispatch;
pub mod ledger;
pub mod model;

// Re-export the main types
pub use dispatch::{DeliveryOutcome, OtpDispatcher};
pub use ledger::OtpLedger;
pub use model::{OtpPurpose, OtpRecord};
