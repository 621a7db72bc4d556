//! # genstore: generate media from text and keep it
//!
//! `genstore` is a small HTTP service that turns a text prompt into a PNG image or an MP3
//! voiceover by calling an upstream generative provider, stores the result in public object
//! storage, and hands back the URL.
//!
//! ## Request Flow
//!
//! Both endpoints run the same [`pipeline::Pipeline`]:
//!
//! 1. **Validate** the caller's text. Missing, mistyped, or blank input is a `400` and no provider
//!    is called.
//! 2. **Generate** through a [`providers::MediaProvider`]. Images come from Stability AI
//!    (`text-to-image`, 1024x1024, 30 steps), voiceovers from ElevenLabs.
//! 3. **Upload** through an [`storage::ObjectStore`] under `channel-images/` or `voiceovers/` with
//!    a key of the form `{epoch-millis}-{6 base36 chars}.{png|mp3}`.
//!
//! Any failure after validation is a `500` carrying only a generic message. The upstream detail is
//! logged, never returned.
//!
//! ## Routes
//!
//! | Method | Path                     | Body                 |
//! |--------|--------------------------|----------------------|
//! | POST   | `/api/image`             | `{"prompt": "..."}`  |
//! | POST   | `/api/voiceover`         | `{"text": "..."}`    |
//! | GET    | `/healthz`               |                      |
//! | GET    | `/api-docs/openapi.json` |                      |
//! | GET    | `/docs`                  |                      |
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use genstore::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     genstore::install_crypto_provider();
//!     let args = genstore::config::Args::parse();
//!     let config = Config::load(&args)?;
//!     genstore::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     Application::new(config)
//!         .await?
//!         .serve(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await
//! }
//! ```

pub mod api;
pub mod config;
pub mod errors;
pub mod openapi;
pub mod pipeline;
pub mod providers;
pub mod storage;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use axum::{
    Json, Router,
    routing::{get, post},
};
use bon::Builder;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use config::Config;

use crate::openapi::ApiDoc;
use crate::pipeline::Pipeline;
use crate::providers::create_provider;
use crate::storage::create_store;
use crate::types::MediaKind;

/// Install the aws-lc-rs rustls provider as the process default.
///
/// Both the provider clients and the S3 client need it. Repeated calls are harmless.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

/// Shared by all handlers. Each pipeline is independent of the other and of any request.
#[derive(Clone, Builder)]
pub struct AppState {
    pub image: Arc<Pipeline>,
    pub voiceover: Arc<Pipeline>,
}

/// Build the HTTP router with every route and the request tracing layer.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/api/image", post(api::handlers::generation::generate_image))
        .route("/api/voiceover", post(api::handlers::generation::generate_voiceover))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .with_state(state)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Owns the router and the configuration it was built from.
///
/// 1. [`Application::new`] builds the provider clients and the object store
/// 2. [`Application::serve`] binds the listener and runs until `shutdown` resolves
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!(
            host = %config.host,
            port = config.port,
            storage = ?config.storage.backend,
            "Starting genstore"
        );

        let http = reqwest::Client::builder().build()?;
        let store = create_store(&config.storage).await;
        let image = Pipeline::new(create_provider(MediaKind::Image, &config.providers, http.clone()), store.clone());
        let voiceover = Pipeline::new(create_provider(MediaKind::Audio, &config.providers, http), store);

        let state = AppState::builder()
            .image(Arc::new(image))
            .voiceover(Arc::new(voiceover))
            .build();

        Ok(Self {
            router: build_router(state),
            config,
        })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("genstore listening on http://{}", listener.local_addr()?);

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
