//! S3 (and S3-compatible) backend.
//!
//! Objects are written with a `public-read` ACL. The public URL uses the same addressing style
//! the client writes with: virtual-hosted (`https://{bucket}.s3.amazonaws.com/{key}`, or
//! `{scheme}://{bucket}.{endpoint-host}{endpoint-path}/{key}` for a custom endpoint) unless
//! `force_path_style` is set, in which case it is `{endpoint}/{bucket}/{key}`.
//!
//! SDK retries are disabled: a failed put fails the request.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use tracing::info;
use url::Url;

use super::{ObjectStore, Result, StorageError, StorageKey};
use crate::config::S3Config;
use crate::types::{Namespace, ProviderPayload, StoredArtifact};

const DEFAULT_S3_HOST: &str = "s3.amazonaws.com";

pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    url_base: PublicUrlBase,
}

/// How public URLs are derived from a key.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PublicUrlBase {
    /// `{prefix}/{key}` where the prefix already contains the bucket
    VirtualHosted(String),
    /// `{endpoint}/{bucket}/{key}`
    PathStyle(String),
}

impl PublicUrlBase {
    fn from_config(config: &S3Config) -> Self {
        match &config.endpoint {
            None => Self::VirtualHosted(format!("https://{}.{}", config.bucket, DEFAULT_S3_HOST)),
            Some(endpoint) if config.force_path_style => Self::PathStyle(trimmed(endpoint)),
            Some(endpoint) => {
                let host = endpoint.host_str().unwrap_or(DEFAULT_S3_HOST);
                let port = endpoint.port().map(|p| format!(":{p}")).unwrap_or_default();
                let path = endpoint.path().trim_end_matches('/');
                Self::VirtualHosted(format!(
                    "{}://{}.{}{}{}",
                    endpoint.scheme(),
                    config.bucket,
                    host,
                    port,
                    path
                ))
            }
        }
    }

    fn url_for(&self, bucket: &str, key: &StorageKey) -> String {
        match self {
            Self::VirtualHosted(prefix) => format!("{prefix}/{key}"),
            Self::PathStyle(endpoint) => format!("{endpoint}/{bucket}/{key}"),
        }
    }
}

fn trimmed(url: &Url) -> String {
    url.as_str().trim_end_matches('/').to_string()
}

impl S3ObjectStore {
    /// Build the S3 client from explicit configuration. Nothing is read from the environment
    /// at request time.
    pub async fn new(config: &S3Config) -> Self {
        let credentials = Credentials::new(
            config.access_key_id.clone().unwrap_or_default(),
            config.secret_access_key.clone().unwrap_or_default(),
            None,
            None,
            "genstore-config",
        );

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone().unwrap_or_default()))
            .credentials_provider(credentials)
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style)
            .retry_config(RetryConfig::disabled());
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(trimmed(endpoint));
        }

        Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
            url_base: PublicUrlBase::from_config(config),
        }
    }

    fn public_url(&self, key: &StorageKey) -> String {
        self.url_base.url_for(&self.bucket, key)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[tracing::instrument(skip_all, fields(bucket = %self.bucket, namespace = %namespace, bytes = payload.len()))]
    async fn upload(&self, payload: ProviderPayload, namespace: Namespace) -> Result<StoredArtifact> {
        let content_type = payload.content_type();
        let key = StorageKey::generate(namespace, content_type);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .body(ByteStream::from(payload.into_bytes()))
            .content_type(content_type.mime())
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| StorageError::Put {
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        info!(key = %key, content_type = %content_type, "Uploaded artifact to S3");

        Ok(StoredArtifact {
            url: self.public_url(&key),
        })
    }
}
