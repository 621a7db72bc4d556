//! HTTP API: route handlers and their request/response models.
//!
//! - `POST /api/image` - `{ "prompt": string }` → `{ "url": string }`
//! - `POST /api/voiceover` - `{ "text": string }` → `{ "url": string }`
//!
//! Errors are `{ "error": string }` with status 400 for missing input and 500 for any
//! generation or storage failure.

pub mod handlers;
pub mod models;
