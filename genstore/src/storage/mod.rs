//! Object storage for generated artifacts.
//!
//! Every backend generates its own [`StorageKey`] per upload, writes the payload with its
//! content type, and returns the public URL the object can be fetched from. Stored objects are
//! world-readable by URL; there is no delete or update path.

use async_trait::async_trait;
use chrono::Utc;
use rand::prelude::RngExt;
use rand::rng;
use std::fmt;
use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use crate::types::{ContentType, Namespace, ProviderPayload, StoredArtifact};

pub mod local;
pub mod s3;

pub use local::LocalObjectStore;
pub use s3::S3ObjectStore;

/// Result type for object store operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors raised while writing an artifact
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The object store rejected or failed the put (auth, bucket misconfiguration, network)
    #[error("put of {key} failed: {message}")]
    Put { key: String, message: String },

    /// Writing to the local filesystem backend failed
    #[error("write of {key} failed: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// Build the configured object store.
///
/// This is the single point where storage configuration becomes a backend instance.
pub async fn create_store(config: &StorageConfig) -> Arc<dyn ObjectStore> {
    match config.backend {
        StorageBackend::S3 => Arc::new(S3ObjectStore::new(&config.s3).await),
        StorageBackend::Local => Arc::new(LocalObjectStore::new(&config.local)),
    }
}

/// Durable, publicly readable blob storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store the payload under a freshly generated key in `namespace` and return its public URL.
    async fn upload(&self, payload: ProviderPayload, namespace: Namespace) -> Result<StoredArtifact>;
}

const KEY_SUFFIX_LEN: usize = 6;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Object key of the form `{namespace}/{unix-millis}-{6 base36 chars}.{ext}`.
///
/// Uniqueness comes from the millisecond timestamp plus the random suffix; nothing checks for
/// collisions storage-side.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn generate(namespace: Namespace, content_type: ContentType) -> Self {
        Self::from_parts(namespace, Utc::now().timestamp_millis(), &random_suffix(), content_type)
    }

    fn from_parts(namespace: Namespace, millis: i64, suffix: &str, content_type: ContentType) -> Self {
        Self(format!("{}/{}-{}.{}", namespace, millis, suffix, content_type.extension()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn random_suffix() -> String {
    let mut rng = rng();
    (0..KEY_SUFFIX_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect()
}
