//! Test doubles and fixtures shared by unit and handler tests.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::{Arc, Mutex};

use crate::config::{Config, S3Config};
use crate::pipeline::Pipeline;
use crate::providers::{self, MediaProvider, UpstreamError};
use crate::storage::{self, ObjectStore, StorageError};
use crate::types::{ContentType, GenerationRequest, MediaKind, Namespace, ProviderPayload, StoredArtifact};

/// A configuration that passes validation. Provider URLs still point at the real services.
pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.host = "127.0.0.1".to_string();
    config.port = 0;
    config.providers.image.api_key = Some("sk-image".to_string());
    config.providers.audio.api_key = Some("xi-audio".to_string());
    config.storage.s3 = S3Config {
        bucket: "media".to_string(),
        region: Some("us-east-1".to_string()),
        access_key_id: Some("AKID".to_string()),
        secret_access_key: Some("shh".to_string()),
        endpoint: None,
        force_path_style: false,
    };
    config
}

type UpstreamFailure = Box<dyn Fn() -> UpstreamError + Send + Sync>;

/// Provider returning a fixed payload (or a fixed failure) and recording each call's text.
pub struct RecordingProvider {
    kind: MediaKind,
    outcome: Result<(Bytes, ContentType), UpstreamFailure>,
    texts: Mutex<Vec<String>>,
}

impl RecordingProvider {
    pub fn image_ok(bytes: Vec<u8>) -> Self {
        Self::ok(MediaKind::Image, bytes, ContentType::ImagePng)
    }

    pub fn audio_ok(bytes: Vec<u8>) -> Self {
        Self::ok(MediaKind::Audio, bytes, ContentType::AudioMpeg)
    }

    fn ok(kind: MediaKind, bytes: Vec<u8>, content_type: ContentType) -> Self {
        Self {
            kind,
            outcome: Ok((Bytes::from(bytes), content_type)),
            texts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(kind: MediaKind, failure: impl Fn() -> UpstreamError + Send + Sync + 'static) -> Self {
        Self {
            kind,
            outcome: Err(Box::new(failure)),
            texts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.texts.lock().unwrap().len()
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaProvider for RecordingProvider {
    fn kind(&self) -> MediaKind {
        self.kind
    }

    async fn generate(&self, request: &GenerationRequest) -> providers::Result<ProviderPayload> {
        self.texts.lock().unwrap().push(request.text().to_string());
        match &self.outcome {
            Ok((bytes, content_type)) => Ok(ProviderPayload::new(bytes.clone(), *content_type).expect("non-empty test payload")),
            Err(failure) => Err(failure()),
        }
    }
}

/// What a [`RecordingStore`] was asked to upload
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub namespace: Namespace,
    pub content_type: ContentType,
    pub bytes: Bytes,
}

type StorageFailure = Box<dyn Fn() -> StorageError + Send + Sync>;

/// Object store returning a fixed URL (or a fixed failure) and recording every upload.
pub struct RecordingStore {
    outcome: Result<String, StorageFailure>,
    uploads: Mutex<Vec<RecordedUpload>>,
}

impl RecordingStore {
    pub fn ok(url: &str) -> Self {
        Self {
            outcome: Ok(url.to_string()),
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(failure: impl Fn() -> StorageError + Send + Sync + 'static) -> Self {
        Self {
            outcome: Err(Box::new(failure)),
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for RecordingStore {
    async fn upload(&self, payload: ProviderPayload, namespace: Namespace) -> storage::Result<StoredArtifact> {
        self.uploads.lock().unwrap().push(RecordedUpload {
            namespace,
            content_type: payload.content_type(),
            bytes: payload.into_bytes(),
        });
        match &self.outcome {
            Ok(url) => Ok(StoredArtifact { url: url.clone() }),
            Err(failure) => Err(failure()),
        }
    }
}

/// Pipelines wired to the given providers and a shared store
pub fn pipelines(
    image: Arc<dyn MediaProvider>,
    audio: Arc<dyn MediaProvider>,
    store: Arc<dyn ObjectStore>,
) -> (Arc<Pipeline>, Arc<Pipeline>) {
    (
        Arc::new(Pipeline::new(image, store.clone())),
        Arc::new(Pipeline::new(audio, store)),
    )
}
