use recaudo_core::TransactionId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// `{ success: true, data }` body of the interactive routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSuccess<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiSuccess<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionRequest {
    #[serde(default)]
    pub ids: Vec<TransactionId>,
}

/// The taxpayer as the payment ticket describes them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribuyente {
    #[serde(default)]
    pub dni: Option<String>,
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telefono: Option<String>,
}

/// One selected debt on the payment ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptoPago {
    #[serde(rename = "IdTrans")]
    pub id_trans: TransactionId,
    #[serde(rename = "Detalle", alias = "descripcion", default)]
    pub detalle: Option<String>,
    #[serde(rename = "Total", alias = "monto", default)]
    pub total: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitiatePaymentRequest {
    #[serde(default)]
    pub conceptos: Option<Vec<ConceptoPago>>,
    #[serde(default)]
    pub contribuyente: Option<Contribuyente>,
    #[serde(rename = "montoTotal", default)]
    pub monto_total: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiatePaymentResponse {
    pub success: bool,
    pub redirect_url: String,
    pub external_reference: String,
}

/// Acknowledgement returned to the payment gateway for every webhook delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_processed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numero_pago: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settled_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<usize>,
}

impl WebhookAck {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            received: false,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            received: true,
            processed: Some(false),
            message: Some(message.into()),
            ..Self::default()
        }
    }
}
