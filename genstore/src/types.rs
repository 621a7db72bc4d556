//! Request-scoped domain types shared by the pipeline, the providers and the object store.
//!
//! - [`MediaKind`]: which pipeline a request belongs to (image or audio)
//! - [`ContentType`]: the closed allow-list of payload content types
//! - [`Namespace`]: the object store key prefix for each kind of artifact
//! - [`GenerationRequest`]: validated caller input
//! - [`ProviderPayload`]: non-empty binary output of a provider
//! - [`StoredArtifact`]: the public URL handed back to the caller

use bytes::Bytes;
use serde::Serialize;
use std::fmt;

/// The two media pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
        }
    }

    /// Object store prefix that artifacts of this kind are written under.
    pub fn namespace(self) -> Namespace {
        match self {
            MediaKind::Image => Namespace::ChannelImages,
            MediaKind::Audio => Namespace::Voiceovers,
        }
    }

    /// Name of the inbound JSON field carrying the text, as shown in validation messages.
    pub fn input_label(self) -> &'static str {
        match self {
            MediaKind::Image => "Prompt",
            MediaKind::Audio => "Text",
        }
    }

    /// The message callers see for any failure after validation.
    pub fn failure_message(self) -> &'static str {
        match self {
            MediaKind::Image => "Failed to generate image",
            MediaKind::Audio => "Failed to generate voiceover",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content types a provider payload may carry. Anything else cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    ImagePng,
    AudioMpeg,
}

impl ContentType {
    pub fn mime(self) -> &'static str {
        match self {
            ContentType::ImagePng => "image/png",
            ContentType::AudioMpeg => "audio/mpeg",
        }
    }

    /// File extension used for storage keys.
    pub fn extension(self) -> &'static str {
        match self {
            ContentType::ImagePng => "png",
            ContentType::AudioMpeg => "mp3",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// Logical key prefix segregating artifact types in the object store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    ChannelImages,
    Voiceovers,
}

impl Namespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::ChannelImages => "channel-images",
            Namespace::Voiceovers => "voiceovers",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller input after validation. The text is guaranteed non-empty once trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    kind: MediaKind,
    text: String,
}

impl GenerationRequest {
    /// Validate raw caller input. Returns `None` when the text is missing or blank.
    ///
    /// Non-blank text is kept as-is (not trimmed) so providers receive exactly what the
    /// caller sent.
    pub fn new(kind: MediaKind, text: Option<String>) -> Option<Self> {
        let text = text?;
        if text.trim().is_empty() {
            return None;
        }
        Some(Self { kind, text })
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Binary output of a provider, owned by the pipeline until it is moved into the uploader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderPayload {
    bytes: Bytes,
    content_type: ContentType,
}

impl ProviderPayload {
    /// Returns `None` for an empty body; an empty artifact is never a valid payload.
    pub fn new(bytes: impl Into<Bytes>, content_type: ContentType) -> Option<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return None;
        }
        Some(Self { bytes, content_type })
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

/// The only thing returned to the caller on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub url: String,
}
