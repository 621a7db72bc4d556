//! Local filesystem backend: writes `{path}/{key}` and serves it from `{public_base_url}/{key}`.
//! Useful for development and testing.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

use super::{ObjectStore, Result, StorageError, StorageKey};
use crate::config::LocalStorageConfig;
use crate::types::{Namespace, ProviderPayload, StoredArtifact};

pub struct LocalObjectStore {
    base_path: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(config: &LocalStorageConfig) -> Self {
        Self {
            base_path: config.path.clone(),
            public_base_url: config
                .public_base_url
                .as_ref()
                .map(|url| url.as_str().trim_end_matches('/').to_string())
                .unwrap_or_default(),
        }
    }

    fn public_url(&self, key: &StorageKey) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

/// Sibling of `path` that bytes are written to before the rename. Dot-prefixed so static file
/// servers skip it.
fn staging_path(path: &Path) -> PathBuf {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!(".{name}.partial"))
}

/// Only a fully written and synced file ever appears at `path`. On failure the staging file is
/// removed.
async fn write_then_rename(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let staging = staging_path(path);
    let result = async {
        let mut file = fs::File::create(&staging).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        fs::rename(&staging, path).await
    }
    .await;

    if result.is_err()
        && let Err(e) = fs::remove_file(&staging).await
        && e.kind() != io::ErrorKind::NotFound
    {
        tracing::warn!(path = %staging.display(), error = %e, "Failed to remove staging file");
    }
    result
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    #[tracing::instrument(skip_all, fields(namespace = %namespace, bytes = payload.len()))]
    async fn upload(&self, payload: ProviderPayload, namespace: Namespace) -> Result<StoredArtifact> {
        let key = StorageKey::generate(namespace, payload.content_type());
        let full_path = self.base_path.join(key.as_str());
        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        write_then_rename(&full_path, payload.bytes()).await.map_err(io_err)?;

        info!(key = %key, path = %full_path.display(), "Stored artifact on local filesystem");

        Ok(StoredArtifact {
            url: self.public_url(&key),
        })
    }
}
