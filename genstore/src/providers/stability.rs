//! Stability text-to-image client.
//!
//! `POST {host}/v1/generation/{engine_id}/text-to-image` with bearer auth. The response is a JSON
//! envelope of base64 artifacts; the first artifact with a non-empty payload becomes a PNG.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64_STANDARD};
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::{MalformedReason, MediaProvider, Result, UpstreamError, error_body};
use crate::config::ImageProviderConfig;
use crate::types::{ContentType, GenerationRequest, MediaKind, ProviderPayload};

// Fixed generation parameters
const CFG_SCALE: u32 = 7;
const HEIGHT: u32 = 1024;
const WIDTH: u32 = 1024;
const STEPS: u32 = 30;
const SAMPLES: u32 = 1;

#[derive(Debug, Serialize)]
struct TextToImageRequest<'a> {
    text_prompts: [TextPrompt<'a>; 1],
    cfg_scale: u32,
    height: u32,
    width: u32,
    steps: u32,
    samples: u32,
}

#[derive(Debug, Serialize)]
struct TextPrompt<'a> {
    text: &'a str,
}

impl<'a> TextToImageRequest<'a> {
    fn new(prompt: &'a str) -> Self {
        Self {
            text_prompts: [TextPrompt { text: prompt }],
            cfg_scale: CFG_SCALE,
            height: HEIGHT,
            width: WIDTH,
            steps: STEPS,
            samples: SAMPLES,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TextToImageResponse {
    artifacts: Vec<Artifact>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Artifact {
    #[serde(default)]
    base64: String,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default)]
    finish_reason: Option<String>,
}

pub struct StabilityProvider {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout: Option<Duration>,
}

impl StabilityProvider {
    pub fn new(config: &ImageProviderConfig, timeout: Option<Duration>, http: reqwest::Client) -> Self {
        let endpoint = format!(
            "{}/v1/generation/{}/text-to-image",
            config.host.as_str().trim_end_matches('/'),
            config.engine_id
        );
        Self {
            http,
            endpoint,
            api_key: config.api_key.clone().unwrap_or_default(),
            timeout,
        }
    }

    fn malformed(reason: MalformedReason) -> UpstreamError {
        UpstreamError::Malformed {
            provider: MediaKind::Image,
            reason,
        }
    }

    fn decode(body: &[u8]) -> Result<ProviderPayload> {
        let response: TextToImageResponse =
            serde_json::from_slice(body).map_err(|e| Self::malformed(MalformedReason::InvalidBody(e.to_string())))?;

        let artifact = response
            .artifacts
            .into_iter()
            .find(|artifact| !artifact.base64.is_empty())
            .ok_or_else(|| Self::malformed(MalformedReason::EmptyResult))?;

        debug!(seed = ?artifact.seed, finish_reason = ?artifact.finish_reason, "Selected image artifact");

        let bytes = BASE64_STANDARD
            .decode(artifact.base64.as_bytes())
            .map_err(|e| Self::malformed(MalformedReason::InvalidEncoding(e.to_string())))?;

        ProviderPayload::new(bytes, ContentType::ImagePng).ok_or_else(|| Self::malformed(MalformedReason::EmptyResult))
    }
}

#[async_trait]
impl MediaProvider for StabilityProvider {
    fn kind(&self) -> MediaKind {
        MediaKind::Image
    }

    #[tracing::instrument(skip_all, fields(provider = "stability", endpoint = %self.endpoint))]
    async fn generate(&self, request: &GenerationRequest) -> Result<ProviderPayload> {
        let transport = |source| UpstreamError::Transport {
            provider: MediaKind::Image,
            source,
        };

        let mut builder = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header(ACCEPT, "application/json")
            .json(&TextToImageRequest::new(request.text()));
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Rejected {
                provider: MediaKind::Image,
                status,
                detail: error_body(response).await,
            });
        }

        let body = response.bytes().await.map_err(transport)?;
        let payload = Self::decode(&body)?;

        info!(bytes = payload.len(), "Image generated");
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImageProviderConfig;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(host: &str) -> StabilityProvider {
        crate::install_crypto_provider();
        let config = ImageProviderConfig {
            api_key: Some("sk-test".to_string()),
            host: host.parse().unwrap(),
            ..Default::default()
        };
        StabilityProvider::new(&config, None, reqwest::Client::new())
    }

    fn request(text: &str) -> GenerationRequest {
        GenerationRequest::new(MediaKind::Image, Some(text.to_string())).unwrap()
    }

    const ENGINE_PATH: &str = "/v1/generation/stable-diffusion-xl-1024-v1-0/text-to-image";

    #[test_log::test(tokio::test)]
    async fn decodes_first_artifact_into_png_payload() {
        let mock_server = MockServer::start().await;
        let image = vec![0x89u8, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 1, 2, 3];
        Mock::given(method("POST"))
            .and(path(ENGINE_PATH))
            .and(header("authorization", "Bearer sk-test"))
            .and(header("accept", "application/json"))
            .and(body_json(json!({
                "text_prompts": [{ "text": "a red fox" }],
                "cfg_scale": 7,
                "height": 1024,
                "width": 1024,
                "steps": 30,
                "samples": 1
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "artifacts": [{
                    "base64": BASE64_STANDARD.encode(&image),
                    "seed": 1234,
                    "finishReason": "SUCCESS"
                }]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let payload = provider_for(&mock_server.uri()).generate(&request("a red fox")).await.unwrap();

        assert_eq!(payload.len(), image.len());
        assert_eq!(payload.bytes().as_ref(), image.as_slice());
        assert_eq!(payload.content_type(), ContentType::ImagePng);
    }

    #[test_log::test(tokio::test)]
    async fn skips_artifacts_without_payload() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENGINE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "artifacts": [
                    { "base64": "", "seed": 1, "finishReason": "ERROR" },
                    { "base64": BASE64_STANDARD.encode([9u8, 9, 9]), "seed": 2, "finishReason": "SUCCESS" }
                ]
            })))
            .mount(&mock_server)
            .await;

        let payload = provider_for(&mock_server.uri()).generate(&request("fox")).await.unwrap();

        assert_eq!(payload.bytes().as_ref(), &[9u8, 9, 9]);
    }

    #[test_log::test(tokio::test)]
    async fn empty_artifact_list_is_empty_result() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "artifacts": [] })))
            .mount(&mock_server)
            .await;

        let err = provider_for(&mock_server.uri()).generate(&request("fox")).await.unwrap_err();

        match err {
            UpstreamError::Malformed { provider, reason } => {
                assert_eq!(provider, MediaKind::Image);
                assert_eq!(reason, MalformedReason::EmptyResult);
            }
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test_log::test(tokio::test)]
    async fn missing_artifacts_field_is_invalid_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "images": [] })))
            .mount(&mock_server)
            .await;

        let err = provider_for(&mock_server.uri()).generate(&request("fox")).await.unwrap_err();

        assert!(matches!(
            err,
            UpstreamError::Malformed {
                reason: MalformedReason::InvalidBody(_),
                ..
            }
        ));
    }

    #[test_log::test(tokio::test)]
    async fn invalid_base64_is_invalid_encoding() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "artifacts": [{ "base64": "not base64!!", "seed": 1, "finishReason": "SUCCESS" }]
            })))
            .mount(&mock_server)
            .await;

        let err = provider_for(&mock_server.uri()).generate(&request("fox")).await.unwrap_err();

        assert!(matches!(
            err,
            UpstreamError::Malformed {
                reason: MalformedReason::InvalidEncoding(_),
                ..
            }
        ));
    }

    #[test_log::test(tokio::test)]
    async fn non_success_status_keeps_upstream_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("engine overloaded, try later"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let err = provider_for(&mock_server.uri()).generate(&request("fox")).await.unwrap_err();

        match &err {
            UpstreamError::Rejected { provider, status, detail } => {
                assert_eq!(*provider, MediaKind::Image);
                assert_eq!(status.as_u16(), 503);
                assert_eq!(detail, "engine overloaded, try later");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
        assert!(err.to_string().contains("engine overloaded, try later"));
        assert!(err.is_transient());
    }

    #[test_log::test(tokio::test)]
    async fn unreachable_host_is_transport_failure() {
        // Bind then drop a listener so the port is very likely closed
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = provider_for(&format!("http://{addr}"))
            .generate(&request("fox"))
            .await
            .unwrap_err();

        assert!(matches!(err, UpstreamError::Transport { provider: MediaKind::Image, .. }));
        assert_eq!(err.class(), "transport");
    }

    #[test_log::test(tokio::test)]
    async fn configured_timeout_expires_as_transport_failure() {
        crate::install_crypto_provider();
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "artifacts": [] }))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;
        let config = ImageProviderConfig {
            api_key: Some("sk-test".to_string()),
            host: mock_server.uri().parse().unwrap(),
            ..Default::default()
        };
        let provider = StabilityProvider::new(&config, Some(Duration::from_millis(50)), reqwest::Client::new());

        let err = provider.generate(&request("fox")).await.unwrap_err();

        match err {
            UpstreamError::Transport { source, .. } => assert!(source.is_timeout()),
            other => panic!("expected Transport, got {other:?}"),
        }
    }
}
