//! ElevenLabs text-to-speech client.
//!
//! `POST {base_url}/v1/text-to-speech/{voice_id}` with the `xi-api-key` header. A successful
//! response body is the MP3 itself, with no envelope.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

use super::{MalformedReason, MediaProvider, Result, UpstreamError, error_body};
use crate::config::AudioProviderConfig;
use crate::types::{ContentType, GenerationRequest, MediaKind, ProviderPayload};

const API_KEY_HEADER: &str = "xi-api-key";
const STABILITY: f32 = 0.5;
const SIMILARITY_BOOST: f32 = 0.75;

#[derive(Debug, Serialize)]
struct TextToSpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

pub struct ElevenLabsProvider {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model_id: String,
    timeout: Option<Duration>,
}

impl ElevenLabsProvider {
    pub fn new(config: &AudioProviderConfig, timeout: Option<Duration>, http: reqwest::Client) -> Self {
        let endpoint = format!(
            "{}/v1/text-to-speech/{}",
            config.base_url.as_str().trim_end_matches('/'),
            config.voice_id
        );
        Self {
            http,
            endpoint,
            api_key: config.api_key.clone().unwrap_or_default(),
            model_id: config.model_id.clone(),
            timeout,
        }
    }
}

#[async_trait]
impl MediaProvider for ElevenLabsProvider {
    fn kind(&self) -> MediaKind {
        MediaKind::Audio
    }

    #[tracing::instrument(skip_all, fields(provider = "elevenlabs", endpoint = %self.endpoint))]
    async fn generate(&self, request: &GenerationRequest) -> Result<ProviderPayload> {
        let transport = |source| UpstreamError::Transport {
            provider: MediaKind::Audio,
            source,
        };

        let body = TextToSpeechRequest {
            text: request.text(),
            model_id: &self.model_id,
            voice_settings: VoiceSettings {
                stability: STABILITY,
                similarity_boost: SIMILARITY_BOOST,
            },
        };

        let mut builder = self.http.post(&self.endpoint).header(API_KEY_HEADER, &self.api_key).json(&body);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let text = error_body(response).await;
            return Err(UpstreamError::Rejected {
                provider: MediaKind::Audio,
                status,
                detail: format!(
                    "{} ({}) - {}",
                    status.canonical_reason().unwrap_or("Unknown Status"),
                    status.as_u16(),
                    text
                ),
            });
        }

        let audio = response.bytes().await.map_err(transport)?;
        let payload = ProviderPayload::new(audio, ContentType::AudioMpeg).ok_or(UpstreamError::Malformed {
            provider: MediaKind::Audio,
            reason: MalformedReason::EmptyResult,
        })?;

        info!(bytes = payload.len(), "Voiceover generated");
        Ok(payload)
    }
}
