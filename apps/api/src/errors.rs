use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::providers::ProviderError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// The wire shape is `{"success": false, "error": "..."}` on every failure —
/// clients branch on `success`, never on HTTP status alone.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Input too large. Please reduce content.")]
    ContentTooLarge,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::ContentTooLarge | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            // Configuration errors terminate the request early but must
            // still carry a message the UI can render to the end user.
            AppError::Provider(
                ProviderError::UnknownProvider(_) | ProviderError::MissingCredential { .. },
            ) => StatusCode::BAD_REQUEST,
            AppError::Provider(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {self}");
        }

        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderId;

    #[test]
    fn test_unknown_provider_message_names_the_provider() {
        let err = AppError::from(ProviderError::UnknownProvider("bedrock".to_string()));
        assert!(err.to_string().contains("bedrock"));
    }

    #[test]
    fn test_missing_credential_message_is_user_facing() {
        let err = AppError::from(ProviderError::MissingCredential {
            provider: ProviderId::Groq,
        });
        assert!(err.to_string().contains("Groq API key is missing"));
    }

    #[test]
    fn test_content_too_large_message() {
        assert_eq!(
            AppError::ContentTooLarge.to_string(),
            "Input too large. Please reduce content."
        );
    }
}
