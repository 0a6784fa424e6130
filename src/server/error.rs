use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

const PROVIDER_ERROR_MESSAGE: &str =
    "OAuth validation error - please ensure the app complies with Google's OAuth 2.0 policy";

/// Errors returned by the auth endpoints as JSON bodies.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("Missing authorization code")]
    MissingCode,

    /// The identity provider rejected the code exchange.
    #[error("OAuth validation error: {error}")]
    ProviderExchange {
        error: String,
        error_description: Option<String>,
    },

    /// Provider answered without an identity token.
    #[error("Missing required parameters")]
    MissingIdentityToken,

    #[error("Invalid form data: {0}")]
    InvalidForm(String),

    #[error("Invalid client")]
    InvalidClient,

    #[error("Invalid redirect_uri")]
    InvalidRedirectUri,

    #[error("Invalid state")]
    InvalidState,

    #[error("Not authenticated")]
    Unauthenticated,

    /// Identity provider could not be reached or answered garbage.
    #[error("Identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Internal(#[from] crate::error::Error),
}

impl IntoResponse for EndpointError {
    fn into_response(self) -> Response {
        match self {
            Self::ProviderExchange {
                ref error,
                ref error_description,
            } => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": error,
                    "error_description": error_description,
                    "message": PROVIDER_ERROR_MESSAGE,
                })),
            )
                .into_response(),
            Self::MissingCode
            | Self::MissingIdentityToken
            | Self::InvalidForm(_)
            | Self::InvalidClient
            | Self::InvalidRedirectUri
            | Self::InvalidState => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": self.to_string() }))).into_response()
            }
            Self::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "error": self.to_string() }))).into_response()
            }
            Self::ProviderUnavailable(_) => {
                tracing::error!(error = %self, "Token exchange with identity provider failed");
                (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({ "error": "Identity provider unavailable" })),
                )
                    .into_response()
            }
            Self::Config(_) | Self::Internal(_) => {
                tracing::error!(error = %self, "Auth internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal error" })),
                )
                    .into_response()
            }
        }
    }
}
