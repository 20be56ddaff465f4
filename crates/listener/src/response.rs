//! JSON response bodies.
//!
//! Both endpoints always answer `200 OK`; success and failure are told apart
//! by the body shape. The intake endpoint must never ask the messaging
//! platform to redeliver, and the scan endpoint reports its errors the same
//! way for consistency.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Body written by the intake and scan endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiResponse {
    /// `{"digest": ..., "message": ...}`
    Image { digest: String, message: String },
    /// `{"error": ...}`
    Error { error: String },
}

impl ApiResponse {
    pub fn image(digest: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Image {
            digest: digest.into(),
            message: message.into(),
        }
    }

    pub fn error(err: &impl std::fmt::Display) -> Self {
        Self::Error {
            error: err.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}
