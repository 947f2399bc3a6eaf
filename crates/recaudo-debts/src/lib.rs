pub mod arrears;
pub mod identifier;
pub mod query;

pub use arrears::{ArrearsPolicy, DebtView, format_line_item};
pub use identifier::{SearchKey, SearchKind, classify_identifier, is_valid_dni};
pub use query::{
    ClientDebts, ClientPage, ClientSummary, DebtLookup, DebtQueryEngine, PaymentRecord,
    SelectionSummary, TaxpayerPage, TaxpayerSummary, page_request,
};
