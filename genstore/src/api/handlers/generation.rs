use axum::{Json, extract::State, extract::rejection::JsonRejection};

use crate::AppState;
use crate::api::models::generation::{ErrorResponse, GenerationResponse, ImageGenerationRequest, VoiceoverRequest};
use crate::errors::Result;

/// A body that is not JSON, lacks the field, or has it with the wrong type is treated the same
/// as a missing field.
///
/// This deliberately answers an unparseable body with the 400 validation response rather than the
/// generic 500 generation failure: the caller sent bad input and no provider was called.
fn field_or_none<T>(body: std::result::Result<Json<T>, JsonRejection>, field: impl FnOnce(T) -> Option<String>) -> Option<String> {
    match body {
        Ok(Json(body)) => field(body),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Rejected request body");
            None
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/image",
    tag = "generation",
    summary = "Generate image",
    description = "Generate a 1024x1024 PNG from a text prompt and store it. Returns the public URL of the stored image.",
    request_body = ImageGenerationRequest,
    responses(
        (status = 200, description = "Image generated and stored", body = GenerationResponse),
        (status = 400, description = "Prompt missing or blank", body = ErrorResponse),
        (status = 500, description = "Generation or storage failed", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn generate_image(
    State(state): State<AppState>,
    body: std::result::Result<Json<ImageGenerationRequest>, JsonRejection>,
) -> Result<Json<GenerationResponse>> {
    let prompt = field_or_none(body, |body| body.prompt);
    let artifact = state.image.run(prompt).await?;
    Ok(Json(GenerationResponse { url: artifact.url }))
}

#[utoipa::path(
    post,
    path = "/api/voiceover",
    tag = "generation",
    summary = "Generate voiceover",
    description = "Synthesize speech from text as MP3 and store it. Returns the public URL of the stored audio.",
    request_body = VoiceoverRequest,
    responses(
        (status = 200, description = "Voiceover generated and stored", body = GenerationResponse),
        (status = 400, description = "Text missing or blank", body = ErrorResponse),
        (status = 500, description = "Generation or storage failed", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn generate_voiceover(
    State(state): State<AppState>,
    body: std::result::Result<Json<VoiceoverRequest>, JsonRejection>,
) -> Result<Json<GenerationResponse>> {
    let text = field_or_none(body, |body| body.text);
    let artifact = state.voiceover.run(text).await?;
    Ok(Json(GenerationResponse { url: artifact.url }))
}
