use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use recaudo_core::RecaudoError;
use recaudo_platform::GatewayError;
use serde_json::json;
use tracing::error;

const GENERIC_INTERNAL_MESSAGE: &str = "internal error, please try again later";

/// Failure of an interactive route, rendered as
/// `{ success: false, error: { code, message } }`.
#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    NotFound(String),
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    fn parts(&self) -> (StatusCode, &'static str, &str) {
        match self {
            Self::Validation(message) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message.as_str()),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, "NOT_FOUND", message.as_str()),
            Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                GENERIC_INTERNAL_MESSAGE,
            ),
        }
    }
}

impl From<RecaudoError> for ApiError {
    fn from(err: RecaudoError) -> Self {
        match err {
            RecaudoError::Validation { .. } => Self::Validation(err.to_string()),
            RecaudoError::NotFound(_) => Self::NotFound(err.to_string()),
            RecaudoError::Infrastructure(err) => Self::Internal(format!("{err:#}")),
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Validation(message) => Self::Validation(message),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            error!("request failed: {detail}");
        }
        let (status, code, message) = self.parts();
        let body = json!({
            "success": false,
            "error": { "code": code, "message": message },
        });
        (status, Json(body)).into_response()
    }
}
