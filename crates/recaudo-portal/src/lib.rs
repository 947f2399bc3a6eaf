use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use recaudo_core::LedgerStore;
use recaudo_debts::{ArrearsPolicy, DebtQueryEngine};
use recaudo_finance::ReconciliationEngine;
use recaudo_platform::PaymentGateway;
use tower_http::trace::TraceLayer;

pub mod debts;
pub mod error;
pub mod payments;

pub use error::ApiError;

pub struct AppState<S> {
    pub debts: DebtQueryEngine<S>,
    pub reconciliation: ReconciliationEngine<S>,
    pub gateway: Arc<dyn PaymentGateway>,
    /// Redirect citizens to the live checkout instead of the sandbox.
    pub production: bool,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            debts: self.debts.clone(),
            reconciliation: self.reconciliation.clone(),
            gateway: Arc::clone(&self.gateway),
            production: self.production,
        }
    }
}

impl<S: LedgerStore> AppState<S> {
    pub fn new(
        store: Arc<S>,
        policy: ArrearsPolicy,
        gateway: Arc<dyn PaymentGateway>,
        production: bool,
    ) -> Self {
        Self {
            debts: DebtQueryEngine::new(Arc::clone(&store), policy),
            reconciliation: ReconciliationEngine::new(store),
            gateway,
            production,
        }
    }
}

pub fn app<S: LedgerStore>(state: AppState<S>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/clientes", get(debts::list_clients::<S>))
        .route(
            "/api/clientes/contribuyentes",
            get(debts::list_taxpayers::<S>),
        )
        .route("/api/clientes/{codigo}", get(debts::client_by_code::<S>))
        .route(
            "/api/clientes/deudas/{identifier}",
            get(debts::debts_by_identifier::<S>),
        )
        .route(
            "/api/clientes/buscar/dni/{dni}",
            get(debts::client_by_document::<S>),
        )
        .route(
            "/api/clientes/{codigo}/pagos",
            get(debts::payment_history::<S>),
        )
        .route(
            "/api/clientes/generar-pago",
            post(debts::generate_payment::<S>),
        )
        .route("/pago/iniciar", post(payments::initiate_payment::<S>))
        .route(
            "/api/pagos/confirmacion",
            post(payments::confirm_payment::<S>),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}
