pub mod transaction;

// Re-export the main types
pub use transaction::{PaymentError, PaymentService, Receipt};
