pub mod config;
pub mod contracts;
pub mod db;
pub mod gateway;
pub mod pg_ledger;

pub use config::{MunicipalityConfig, ServiceConfig};
pub use contracts::{
    ApiSuccess, ConceptoPago, Contribuyente, InitiatePaymentRequest, InitiatePaymentResponse,
    SelectionRequest, WebhookAck,
};
pub use db::connect_database;
pub use gateway::{
    GatewayError, HttpPaymentGateway, PaymentGateway, PaymentPreference, PreferenceRequest,
};
pub use pg_ledger::{PgLedgerStore, PgLedgerTx};
