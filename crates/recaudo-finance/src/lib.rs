pub mod idempotency;
pub mod numbering;
pub mod reconciliation;

pub use idempotency::has_been_applied;
pub use numbering::allocate_numero_pago;
pub use reconciliation::{ItemOutcome, ItemResult, ReconciliationEngine, ReconciliationResult};
