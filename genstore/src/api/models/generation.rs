//! API request/response models for generation endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of `POST /api/image`
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ImageGenerationRequest {
    /// Text-to-image prompt
    #[schema(example = "a red fox in the snow, cinematic lighting")]
    pub prompt: Option<String>,
}

/// Body of `POST /api/voiceover`
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct VoiceoverRequest {
    /// Text to speak
    #[schema(example = "Welcome back to the channel!")]
    pub text: Option<String>,
}

/// Successful generation
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct GenerationResponse {
    /// Public URL of the stored artifact
    #[schema(example = "https://media.s3.amazonaws.com/channel-images/1718000000000-k3j9x0.png")]
    pub url: String,
}

/// Error body for every non-200 response
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "Failed to generate image")]
    pub error: String,
}
