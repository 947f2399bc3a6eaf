use thiserror::Error;

/// Failures that escape the engines. Per-item reconciliation outcomes and
/// duplicate deliveries are reported as data, never through this type.
#[derive(Debug, Error)]
pub enum RecaudoError {
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("{0} not found")]
    NotFound(String),
    #[error("infrastructure failure: {0:#}")]
    Infrastructure(#[from] anyhow::Error),
}

impl RecaudoError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Infrastructure(_))
    }
}
