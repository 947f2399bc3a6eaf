use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use recaudo_core::{LedgerStore, PaymentNotification, RecaudoError};
use recaudo_finance::ReconciliationResult;
use recaudo_platform::{
    InitiatePaymentRequest, InitiatePaymentResponse, PreferenceRequest, WebhookAck,
};
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use crate::{AppState, ApiError};

/// Starts a checkout for the selected debts and hands back where to send
/// the citizen.
pub async fn initiate_payment<S: LedgerStore>(
    State(state): State<AppState<S>>,
    body: Result<Json<InitiatePaymentRequest>, JsonRejection>,
) -> Result<Json<InitiatePaymentResponse>, ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError::validation(rejection.body_text()))?;

    let conceptos = request
        .conceptos
        .filter(|conceptos| !conceptos.is_empty())
        .ok_or_else(|| ApiError::validation("no items were selected for payment"))?;
    let contribuyente = request
        .contribuyente
        .filter(|contribuyente| {
            contribuyente
                .dni
                .as_deref()
                .is_some_and(|dni| !dni.trim().is_empty())
        })
        .ok_or_else(|| ApiError::validation("contributor details are required"))?;
    let monto_total = request
        .monto_total
        .filter(|total| *total > Decimal::ZERO)
        .ok_or_else(|| ApiError::validation("total amount must be greater than zero"))?;

    info!(
        "starting payment for {} items, total {}",
        conceptos.len(),
        monto_total
    );

    let preference = state
        .gateway
        .create_preference(PreferenceRequest {
            contribuyente,
            conceptos,
            monto_total,
        })
        .await?;

    Ok(Json(InitiatePaymentResponse {
        success: true,
        redirect_url: preference.redirect_url(state.production).to_string(),
        external_reference: preference.external_reference,
    }))
}

/// Webhook the payment gateway calls on every status change.
pub async fn confirm_payment<S: LedgerStore>(
    State(state): State<AppState<S>>,
    body: Result<Json<PaymentNotification>, JsonRejection>,
) -> (StatusCode, Json<WebhookAck>) {
    let notification = match body {
        Ok(Json(notification)) => notification,
        Err(rejection) => {
            warn!("malformed payment confirmation: {}", rejection.body_text());
            return (
                StatusCode::BAD_REQUEST,
                Json(WebhookAck::rejected(rejection.body_text())),
            );
        }
    };

    info!(
        "payment confirmation received: reference {:?}, status {}, payment {:?}",
        notification.external_reference, notification.status, notification.payment_id
    );

    match state.reconciliation.confirm(notification).await {
        Ok(result) => (StatusCode::OK, Json(acknowledge(&result))),
        Err(RecaudoError::Validation { field, message }) => {
            warn!("rejected payment confirmation: {field}: {message}");
            (
                StatusCode::BAD_REQUEST,
                Json(WebhookAck::rejected(format!("{field}: {message}"))),
            )
        }
        Err(err) => {
            error!("payment confirmation could not be applied: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(WebhookAck::failed(
                    "payment could not be applied, it will need another delivery",
                )),
            )
        }
    }
}

fn acknowledge(result: &ReconciliationResult) -> WebhookAck {
    if result.processed {
        WebhookAck {
            received: true,
            processed: Some(true),
            message: Some("payment applied".to_string()),
            numero_pago: result.numero_pago,
            settled_count: Some(result.settled_count),
            total_count: Some(result.total_count),
            ..WebhookAck::default()
        }
    } else if result.already_processed {
        WebhookAck {
            received: true,
            processed: Some(false),
            already_processed: Some(true),
            message: Some("payment already processed".to_string()),
            ..WebhookAck::default()
        }
    } else {
        WebhookAck {
            received: true,
            processed: Some(false),
            message: result
                .reason
                .as_ref()
                .map(|status| format!("payment status {status}, nothing applied")),
            ..WebhookAck::default()
        }
    }
}
