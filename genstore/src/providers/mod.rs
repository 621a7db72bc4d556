//! Upstream generative-media providers.
//!
//! This module defines the [`MediaProvider`] trait, the single contract both pipelines use to
//! turn validated text into a binary payload. Each variant owns its provider's wire protocol:
//!
//! - [`stability`]: text-to-image, JSON envelope with base64 artifacts
//! - [`elevenlabs`]: text-to-speech, raw audio body
//!
//! Every failure collapses into [`UpstreamError`], which keeps the upstream diagnostic for
//! server-side logs while the handler shows callers a generic message.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::fmt;
use std::sync::Arc;

use crate::config::ProvidersConfig;
use crate::types::{GenerationRequest, MediaKind, ProviderPayload};

pub mod elevenlabs;
pub mod stability;

pub use elevenlabs::ElevenLabsProvider;
pub use stability::StabilityProvider;

/// Create the provider for a media kind from configuration.
///
/// Adding a new provider requires adding a match arm here.
pub fn create_provider(kind: MediaKind, config: &ProvidersConfig, http: reqwest::Client) -> Arc<dyn MediaProvider> {
    match kind {
        MediaKind::Image => Arc::new(StabilityProvider::new(&config.image, config.request_timeout, http)),
        MediaKind::Audio => Arc::new(ElevenLabsProvider::new(&config.audio, config.request_timeout, http)),
    }
}

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, UpstreamError>;

/// Why a 2xx response could not be turned into a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    /// No artifact with a non-empty payload (or an empty audio body)
    EmptyResult,
    /// The body did not match the expected JSON schema
    InvalidBody(String),
    /// The artifact payload was not valid base64
    InvalidEncoding(String),
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedReason::EmptyResult => f.write_str("empty-result"),
            MalformedReason::InvalidBody(detail) => write!(f, "invalid-body: {detail}"),
            MalformedReason::InvalidEncoding(detail) => write!(f, "invalid-encoding: {detail}"),
        }
    }
}

/// Failure of a provider call.
///
/// The three variants keep transport failures, upstream rejections and unusable successes
/// apart for logging; the handler maps all of them to the same caller-visible outcome.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The HTTP call itself could not complete (DNS, connect, timeout, body read)
    #[error("{provider} provider request failed: {source}")]
    Transport {
        provider: MediaKind,
        #[source]
        source: reqwest::Error,
    },

    /// The provider answered with a non-2xx status
    #[error("{provider} provider returned {status}: {detail}")]
    Rejected {
        provider: MediaKind,
        status: StatusCode,
        detail: String,
    },

    /// The provider answered 2xx but the body was unusable
    #[error("{provider} provider returned an unusable response: {reason}")]
    Malformed { provider: MediaKind, reason: MalformedReason },
}

impl UpstreamError {
    pub fn provider(&self) -> MediaKind {
        match self {
            UpstreamError::Transport { provider, .. }
            | UpstreamError::Rejected { provider, .. }
            | UpstreamError::Malformed { provider, .. } => *provider,
        }
    }

    /// Short label for log fields
    pub fn class(&self) -> &'static str {
        match self {
            UpstreamError::Transport { .. } => "transport",
            UpstreamError::Rejected { .. } => "rejected",
            UpstreamError::Malformed { .. } => "malformed",
        }
    }

    /// Whether repeating the same request later could plausibly succeed.
    ///
    /// Only used for logging; nothing in the service retries.
    pub fn is_transient(&self) -> bool {
        match self {
            UpstreamError::Transport { .. } => true,
            UpstreamError::Rejected { status, .. } => {
                *status == StatusCode::REQUEST_TIMEOUT || *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            UpstreamError::Malformed { .. } => false,
        }
    }
}

/// A text-to-media provider.
#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// The media kind this provider produces
    fn kind(&self) -> MediaKind;

    /// Make exactly one upstream call and return its binary payload.
    async fn generate(&self, request: &GenerationRequest) -> Result<ProviderPayload>;
}

/// Read a non-2xx response body for diagnostics. A body that cannot be read is reported
/// in place of the text rather than replacing the rejection with a transport error.
async fn error_body(response: reqwest::Response) -> String {
    match response.text().await {
        Ok(text) => text,
        Err(e) => format!("<unreadable body: {e}>"),
    }
}
