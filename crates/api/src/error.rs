//! `GatewayError` to HTTP response mapping
//!
//! Bodies only ever carry the stable error code; detail stays in the logs.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use relaygate_domain::GatewayError;
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(value: GatewayError) -> Self {
        Self(value)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            GatewayError::InvalidInput(_)
            | GatewayError::Configuration(_)
            | GatewayError::InvalidState(_) => StatusCode::BAD_REQUEST,
            GatewayError::SignatureVerification(_) => StatusCode::UNAUTHORIZED,
            GatewayError::IntegrationNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Decryption(_) => StatusCode::CONFLICT,
            GatewayError::OAuthExchange(_) | GatewayError::Network(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Database(_) | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "request.failed");
        }
        (status, Json(json!({ "error": self.0.code() }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
