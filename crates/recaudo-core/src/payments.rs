use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{error::RecaudoError, models::TransactionId};

/// Opaque bag sent with the payment preference and echoed back verbatim in
/// the confirmation webhook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conceptos_ids: Option<Vec<TransactionId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contribuyente_dni: Option<String>,
}

/// Confirmation body as delivered by the API Gateway.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentNotification {
    #[serde(default)]
    pub external_reference: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub status_detail: Option<String>,
    #[serde(default, deserialize_with = "deserialize_payment_id")]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub transaction_amount: Option<Decimal>,
    #[serde(default)]
    pub date_approved: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Option<NotificationMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatus {
    Approved,
    Rejected,
    Pending,
    Other(String),
}

impl PaymentStatus {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            "pending" => Self::Pending,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approved => f.write_str("approved"),
            Self::Rejected => f.write_str("rejected"),
            Self::Pending => f.write_str("pending"),
            Self::Other(value) => f.write_str(value),
        }
    }
}

/// A notification that passed structural validation.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentConfirmation {
    pub payment_id: String,
    pub status: PaymentStatus,
    pub status_detail: Option<String>,
    pub external_reference: Option<String>,
    pub transaction_amount: Decimal,
    pub date_approved: Option<DateTime<Utc>>,
    pub conceptos_ids: Vec<TransactionId>,
    pub contribuyente_dni: Option<String>,
}

impl TryFrom<PaymentNotification> for PaymentConfirmation {
    type Error = RecaudoError;

    fn try_from(notification: PaymentNotification) -> Result<Self, Self::Error> {
        let payment_id = notification
            .payment_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| RecaudoError::validation("payment_id", "payment_id is required"))?
            .to_string();

        let metadata = notification.metadata.unwrap_or_default();
        let conceptos_ids = metadata.conceptos_ids.ok_or_else(|| {
            RecaudoError::validation(
                "metadata.conceptos_ids",
                "metadata.conceptos_ids is required and must be a list",
            )
        })?;

        Ok(Self {
            payment_id,
            status: PaymentStatus::parse(&notification.status),
            status_detail: notification.status_detail,
            external_reference: notification.external_reference,
            transaction_amount: notification.transaction_amount.unwrap_or(Decimal::ZERO),
            date_approved: notification.date_approved,
            conceptos_ids,
            contribuyente_dni: metadata.contribuyente_dni,
        })
    }
}

/// Row in `payment_applications`; its primary key on `nro_operacion` is what
/// makes concurrent deliveries of one payment apply at most once.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentClaim {
    pub nro_operacion: String,
    pub numero_pago: i64,
    pub external_reference: Option<String>,
    pub transaction_amount: Decimal,
    pub contribuyente_dni: Option<String>,
    pub claimed_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PaymentIdRepr {
    Text(String),
    Unsigned(u64),
    Signed(i64),
}

fn deserialize_payment_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<PaymentIdRepr>::deserialize(deserializer)?;
    Ok(value.map(|repr| match repr {
        PaymentIdRepr::Text(text) => text,
        PaymentIdRepr::Unsigned(number) => number.to_string(),
        PaymentIdRepr::Signed(number) => number.to_string(),
    }))
}
