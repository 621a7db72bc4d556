use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

use crate::pipeline::Stage;
use crate::providers::UpstreamError;
use crate::storage::StorageError;
use crate::types::MediaKind;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Caller input missing, of the wrong type, or blank
    #[error("{} is required", kind.input_label())]
    Validation { kind: MediaKind },

    /// The provider call failed or returned an unusable result
    #[error("{kind} generation failed: {source}")]
    Upstream {
        kind: MediaKind,
        #[source]
        source: UpstreamError,
    },

    /// The generated artifact could not be stored
    #[error("{kind} upload failed: {source}")]
    Storage {
        kind: MediaKind,
        #[source]
        source: StorageError,
    },
}

impl Error {
    pub fn kind(&self) -> MediaKind {
        match self {
            Error::Validation { kind } | Error::Upstream { kind, .. } | Error::Storage { kind, .. } => *kind,
        }
    }

    /// The pipeline stage the request failed in
    pub fn stage(&self) -> Stage {
        match self {
            Error::Validation { .. } => Stage::Validating,
            Error::Upstream { .. } => Stage::Generating,
            Error::Storage { .. } => Stage::Uploading,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::Upstream { .. } | Error::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking upstream or storage details
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation { .. } => self.to_string(),
            Error::Upstream { kind, .. } | Error::Storage { kind, .. } => kind.failure_message().to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Upstream { kind, source } => {
                tracing::error!(
                    kind = %kind,
                    failure = source.class(),
                    transient = source.is_transient(),
                    "Provider error: {:#}",
                    self
                );
            }
            Error::Storage { kind, .. } => {
                tracing::error!(kind = %kind, "Storage error: {:#}", self);
            }
            Error::Validation { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        (self.status_code(), Json(json!({ "error": self.user_message() }))).into_response()
    }
}

/// Type alias for handler results
pub type Result<T> = std::result::Result<T, Error>;
