pub mod error;
pub mod models;
pub mod payments;
pub mod standards;
pub mod storage;

pub use error::RecaudoError;
pub use models::{
    Client, DebtLineItem, NewCollectionEntry, Page, PageRequest, Settlement, TaxpayerRow,
    TransactionId,
};
pub use payments::{NotificationMetadata, PaymentClaim, PaymentConfirmation, PaymentNotification};
pub use standards::{Category, category_for};
pub use storage::{DebtFilter, LedgerStore, LedgerTx};
