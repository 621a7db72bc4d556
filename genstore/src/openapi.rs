//! OpenAPI documentation for the generation endpoints.
//!
//! Served as JSON at `/api-docs/openapi.json` and rendered with Scalar at `/docs`.

use utoipa::OpenApi;

use crate::api;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "genstore",
        description = "Generate images and voiceovers from text and store them at public URLs."
    ),
    paths(
        api::handlers::generation::generate_image,
        api::handlers::generation::generate_voiceover,
    ),
    components(schemas(
        api::models::generation::ImageGenerationRequest,
        api::models::generation::VoiceoverRequest,
        api::models::generation::GenerationResponse,
        api::models::generation::ErrorResponse,
    )),
    tags(
        (name = "generation", description = "Text-to-image and text-to-speech with persistent storage"),
    )
)]
pub struct ApiDoc;
