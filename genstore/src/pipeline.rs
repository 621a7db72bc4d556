//! The generate-and-persist pipeline shared by every media kind.
//!
//! ```text
//! Validating ──► Generating ──► Uploading ──► Done
//!     │              │              │
//!     └──────────────┴──────────────┴──► Errored
//! ```
//!
//! One invocation makes at most one provider call and at most one upload. A payload whose upload
//! fails is dropped with the request.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::errors::{Error, Result};
use crate::providers::MediaProvider;
use crate::storage::ObjectStore;
use crate::types::{GenerationRequest, MediaKind, StoredArtifact};

/// Pipeline state for a single invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Generating,
    Uploading,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validating => "validating",
            Stage::Generating => "generating",
            Stage::Uploading => "uploading",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Validate → generate → upload over one provider and the shared object store.
///
/// Holds no per-request state, so one instance serves concurrent requests.
#[derive(Clone)]
pub struct Pipeline {
    provider: Arc<dyn MediaProvider>,
    store: Arc<dyn ObjectStore>,
}

impl Pipeline {
    pub fn new(provider: Arc<dyn MediaProvider>, store: Arc<dyn ObjectStore>) -> Self {
        Self { provider, store }
    }

    pub fn kind(&self) -> MediaKind {
        self.provider.kind()
    }

    /// Run one invocation from raw caller text.
    #[tracing::instrument(skip_all, fields(kind = %self.kind()))]
    pub async fn run(&self, text: Option<String>) -> Result<StoredArtifact> {
        let kind = self.kind();

        debug!(stage = %Stage::Validating, "Validating input");
        let request = GenerationRequest::new(kind, text).ok_or(Error::Validation { kind })?;

        debug!(stage = %Stage::Generating, chars = request.text().chars().count(), "Calling provider");
        let payload = self
            .provider
            .generate(&request)
            .await
            .map_err(|source| Error::Upstream { kind, source })?;

        debug!(stage = %Stage::Uploading, bytes = payload.len(), content_type = %payload.content_type(), "Uploading artifact");
        let artifact = self
            .store
            .upload(payload, kind.namespace())
            .await
            .map_err(|source| Error::Storage { kind, source })?;

        info!(stage = %Stage::Done, url = %artifact.url, "Artifact stored");
        Ok(artifact)
    }
}
