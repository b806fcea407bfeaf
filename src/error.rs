// This project was developed with assistance from GitHub Copilot
// Error taxonomy shared by the key store, discovery and token issuance

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::types::Validity;

pub type Result<T> = std::result::Result<T, JwksError>;

#[derive(Debug, Error)]
pub enum JwksError {
    /// No key of the requested validity class is stored.
    #[error("no {0} signing key available")]
    NotFound(Validity),

    #[error("key storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Stored material or expiry could not be parsed back.
    #[error("stored key {kid} is corrupt: {reason}")]
    CorruptKey { kid: i64, reason: String },

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// The request carried no usable subject.
    #[error("invalid request: {0}")]
    Input(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl JwksError {
    /// Stable short name used as the `kind` field in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            JwksError::NotFound(_) => "not_found",
            JwksError::Storage(_) => "storage",
            JwksError::CorruptKey { .. } => "corrupt_key",
            JwksError::Signing(_) => "signing",
            JwksError::KeyGeneration(_) => "key_generation",
            JwksError::Input(_) => "input",
            JwksError::Io(_) => "io",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            JwksError::Input(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand back to the caller. Internal kinds stay opaque.
    fn public_message(&self) -> String {
        match self {
            JwksError::Input(msg) => msg.clone(),
            JwksError::NotFound(_) | JwksError::Storage(_) | JwksError::CorruptKey { .. } => {
                "failed to fetch key".to_string()
            }
            JwksError::Signing(_) => "failed to sign token".to_string(),
            JwksError::KeyGeneration(_) | JwksError::Io(_) => "internal server error".to_string(),
        }
    }
}

impl IntoResponse for JwksError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self, "request failed");
        } else {
            tracing::warn!(kind = self.kind(), error = %self, "rejected request");
        }

        let body = Json(json!({ "error": self.public_message() }));
        (status, body).into_response()
    }
}
