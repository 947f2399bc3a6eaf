use std::time::Duration;

use async_trait::async_trait;
use recaudo_core::{NotificationMetadata, TransactionId};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::{
    config::{MunicipalityConfig, ServiceConfig},
    contracts::{ConceptoPago, Contribuyente},
};

const DEFAULT_CONTRIBUYENTE: &str = "Contribuyente";
const DEFAULT_CONCEPTO: &str = "Concepto municipal";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    Validation(String),
    #[error("payment gateway timed out")]
    Timeout,
    #[error("payment gateway unreachable: {0}")]
    Unreachable(String),
    #[error("payment gateway rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("payment gateway sent an invalid response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// Everything except bad input may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Validation(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceRequest {
    pub contribuyente: Contribuyente,
    pub conceptos: Vec<ConceptoPago>,
    pub monto_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentPreference {
    pub payment_url: String,
    pub sandbox_url: String,
    pub external_reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preference_id: Option<String>,
}

impl PaymentPreference {
    pub fn redirect_url(&self, production: bool) -> &str {
        if production {
            &self.payment_url
        } else {
            &self.sandbox_url
        }
    }
}

/// Creates checkout preferences on the upstream payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_preference(
        &self,
        request: PreferenceRequest,
    ) -> Result<PaymentPreference, GatewayError>;
}

#[derive(Debug, Serialize)]
struct ContribuyenteBody<'a> {
    nombre: &'a str,
    email: &'a str,
    dni: &'a str,
    telefono: &'a str,
}

#[derive(Debug, Serialize)]
struct ConceptoBody {
    id: String,
    descripcion: String,
    #[serde(with = "rust_decimal::serde::float")]
    monto: Decimal,
}

#[derive(Debug, Serialize)]
struct CreatePaymentBody<'a> {
    municipio_id: &'a str,
    municipio_nombre: &'a str,
    contribuyente: ContribuyenteBody<'a>,
    conceptos: Vec<ConceptoBody>,
    #[serde(with = "rust_decimal::serde::float")]
    monto_total: Decimal,
    callback_url: &'a str,
    metadata: NotificationMetadata,
}

#[derive(Debug, Deserialize)]
struct GatewayEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<PaymentPreference>,
}

pub struct HttpPaymentGateway {
    base_url: String,
    callback_url: String,
    municipality: MunicipalityConfig,
    client: Client,
}

impl HttpPaymentGateway {
    pub fn new(
        base_url: impl Into<String>,
        callback_url: impl Into<String>,
        municipality: MunicipalityConfig,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| GatewayError::Unreachable(err.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            callback_url: callback_url.into(),
            municipality,
            client,
        })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, GatewayError> {
        Self::new(
            config.api_gateway_url.clone(),
            config.callback_url(),
            config.municipality.clone(),
            config.gateway_timeout,
        )
    }
}

fn validate(request: &PreferenceRequest) -> Result<&str, GatewayError> {
    let dni = request
        .contribuyente
        .dni
        .as_deref()
        .map(str::trim)
        .filter(|dni| !dni.is_empty())
        .ok_or_else(|| GatewayError::Validation("contributor DNI is required".to_string()))?;

    if request.conceptos.is_empty() {
        return Err(GatewayError::Validation(
            "select at least one item to pay".to_string(),
        ));
    }
    if request.monto_total <= Decimal::ZERO {
        return Err(GatewayError::Validation(
            "total amount must be greater than zero".to_string(),
        ));
    }
    Ok(dni)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_preference(
        &self,
        request: PreferenceRequest,
    ) -> Result<PaymentPreference, GatewayError> {
        let dni = validate(&request)?;
        let contribuyente = &request.contribuyente;

        let body = CreatePaymentBody {
            municipio_id: &self.municipality.id,
            municipio_nombre: &self.municipality.display_name,
            contribuyente: ContribuyenteBody {
                nombre: non_blank(contribuyente.nombre.as_deref()).unwrap_or(DEFAULT_CONTRIBUYENTE),
                email: contribuyente.email.as_deref().unwrap_or(""),
                dni,
                telefono: contribuyente.telefono.as_deref().unwrap_or(""),
            },
            conceptos: request
                .conceptos
                .iter()
                .map(|concepto| ConceptoBody {
                    id: concepto.id_trans.to_string(),
                    descripcion: non_blank(concepto.detalle.as_deref())
                        .unwrap_or(DEFAULT_CONCEPTO)
                        .to_string(),
                    monto: concepto.total.unwrap_or(Decimal::ZERO),
                })
                .collect(),
            monto_total: request.monto_total,
            callback_url: &self.callback_url,
            metadata: NotificationMetadata {
                conceptos_ids: Some(
                    request
                        .conceptos
                        .iter()
                        .map(|concepto| concepto.id_trans)
                        .collect::<Vec<TransactionId>>(),
                ),
                contribuyente_dni: Some(dni.to_string()),
            },
        };

        let url = format!("{}/api/pagos", self.base_url);
        info!(
            "requesting payment preference for dni {} ({} items, total {})",
            dni,
            body.conceptos.len(),
            body.monto_total
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                error!("payment gateway request to {url} failed: {err}");
                if err.is_timeout() {
                    GatewayError::Timeout
                } else {
                    GatewayError::Unreachable(err.to_string())
                }
            })?;

        let status = response.status();
        let envelope = response.json::<GatewayEnvelope>().await;

        if !status.is_success() {
            let message = envelope
                .ok()
                .and_then(|envelope| envelope.message)
                .unwrap_or_else(|| format!("server error {}", status.as_u16()));
            error!("payment gateway answered {status}: {message}");
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let envelope = envelope.map_err(|err| GatewayError::InvalidResponse(err.to_string()))?;
        if !envelope.success {
            let message = envelope
                .message
                .unwrap_or_else(|| "unknown payment gateway error".to_string());
            error!("payment gateway refused the preference: {message}");
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let preference = envelope.data.ok_or_else(|| {
            GatewayError::InvalidResponse("success envelope without data".to_string())
        })?;
        info!(
            "payment preference {} created",
            preference.external_reference
        );
        Ok(preference)
    }
}
