//! Axum-specific error types and mappings.
//!
//! Every error is rendered as `{"message": ...}` with the matching status.
//! These errors can only be produced before the audio head is sent.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use novelcast_core::{ResolveError, SpeechError};
use novelcast_tts::SynthesisError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    /// Bad request (invalid input, unsupported source).
    #[error("{0}")]
    BadRequest(String),

    /// Chapter content could not be found.
    #[error("{0}")]
    NotFound(String),

    /// The request did not produce audio within the stream timeout.
    #[error("{0}")]
    Timeout(String),

    /// Internal server error (synthesis failure, provider failure).
    #[error("{0}")]
    Internal(String),
}

impl HttpError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }
        let body = serde_json::json!({ "message": self.to_string() });
        (status, Json(body)).into_response()
    }
}

impl From<ResolveError> for HttpError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::UnsupportedSource(_) => Self::BadRequest(err.to_string()),
            ResolveError::ExtractionFailed(_) => Self::NotFound(err.to_string()),
        }
    }
}

impl From<SynthesisError> for HttpError {
    fn from(err: SynthesisError) -> Self {
        match err {
            SynthesisError::EmptyInput => Self::BadRequest(err.to_string()),
            SynthesisError::Timeout => Self::Timeout(err.to_string()),
            SynthesisError::NoAudioProduced { .. } => Self::Internal(err.to_string()),
        }
    }
}

impl From<SpeechError> for HttpError {
    fn from(err: SpeechError) -> Self {
        Self::Internal(err.to_string())
    }
}
