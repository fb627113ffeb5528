use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{provider} request failed ({context}): {source}")]
    Provider {
        provider: &'static str,
        context: String,
        #[source]
        source: ProviderFailure,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Cause of a single failed provider call. Wrapped into `AppError::Provider`
/// by the dispatcher, which knows the batch position.
#[derive(Debug, Error)]
pub enum ProviderFailure {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed payload: {0}")]
    Payload(String),

    #[error("request could not be built: {0}")]
    Request(String),
}

impl From<serde_json::Error> for ProviderFailure {
    fn from(e: serde_json::Error) -> Self {
        ProviderFailure::Payload(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn provider(provider: &'static str, context: impl Into<String>, source: ProviderFailure) -> Self {
        AppError::Provider {
            provider,
            context: context.into(),
            source,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Provider { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
