use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use recaudo_core::LedgerStore;
use recaudo_debts::{
    ClientDebts, ClientPage, ClientSummary, DebtView, PaymentRecord, SearchKind,
    SelectionSummary, TaxpayerPage, page_request,
};
use recaudo_platform::{ApiSuccess, SelectionRequest};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AppState, ApiError};

#[derive(Debug, Serialize)]
pub struct DebtSearchData {
    pub searched_by: SearchKind,
    pub client: Option<ClientSummary>,
    pub line_items: Vec<DebtView>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub count: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PaymentHistoryData {
    pub codigo: String,
    pub payments: Vec<PaymentRecord>,
    pub count: usize,
}

pub async fn debts_by_identifier<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(identifier): Path<String>,
) -> Result<Json<ApiSuccess<DebtSearchData>>, ApiError> {
    let lookup = state.debts.resolve(&identifier).await?;
    if lookup.is_unknown_document() {
        return Err(ApiError::NotFound(format!(
            "no client registered for document {}",
            identifier.trim()
        )));
    }

    let total = lookup.total();
    Ok(Json(ApiSuccess::new(DebtSearchData {
        searched_by: lookup.searched_by,
        client: lookup.client,
        count: lookup.line_items.len(),
        line_items: lookup.line_items,
        total,
    })))
}

pub async fn client_by_document<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(dni): Path<String>,
) -> Result<Json<ApiSuccess<ClientDebts>>, ApiError> {
    let found = state.debts.find_client_by_document(&dni).await?;
    Ok(Json(ApiSuccess::new(found)))
}

pub async fn client_by_code<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(codigo): Path<String>,
) -> Result<Json<ApiSuccess<ClientSummary>>, ApiError> {
    let client = state.debts.client_by_code(&codigo).await?;
    Ok(Json(ApiSuccess::new(client)))
}

pub async fn list_clients<S: LedgerStore>(
    State(state): State<AppState<S>>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<ApiSuccess<ClientPage>>, ApiError> {
    let Query(params) = params.map_err(|rejection| ApiError::validation(rejection.body_text()))?;
    let page = page_request(params.limit, params.offset)?;
    let listing = state.debts.list_clients(page).await?;
    Ok(Json(ApiSuccess::new(listing)))
}

pub async fn list_taxpayers<S: LedgerStore>(
    State(state): State<AppState<S>>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<ApiSuccess<TaxpayerPage>>, ApiError> {
    let Query(params) = params.map_err(|rejection| ApiError::validation(rejection.body_text()))?;
    let page = page_request(params.limit, params.offset)?;
    let listing = state.debts.list_taxpayers(page).await?;
    Ok(Json(ApiSuccess::new(listing)))
}

pub async fn payment_history<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(codigo): Path<String>,
) -> Result<Json<ApiSuccess<PaymentHistoryData>>, ApiError> {
    let payments = state.debts.payment_history(&codigo).await?;
    Ok(Json(ApiSuccess::new(PaymentHistoryData {
        codigo: codigo.trim().to_string(),
        count: payments.len(),
        payments,
    })))
}

pub async fn generate_payment<S: LedgerStore>(
    State(state): State<AppState<S>>,
    body: Result<Json<SelectionRequest>, JsonRejection>,
) -> Result<Json<ApiSuccess<SelectionSummary>>, ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError::validation(rejection.body_text()))?;
    let summary = state.debts.summarize_selection(&request.ids).await?;
    Ok(Json(ApiSuccess::new(summary)))
}
