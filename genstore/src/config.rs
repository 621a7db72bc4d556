//! Application configuration management.
//!
//! Configuration is loaded once at startup from a YAML file with environment variable overrides,
//! then passed by reference into the provider clients and the object store. Nothing reads the
//! environment while serving requests.
//!
//! ## Loading Priority
//!
//! Sources are merged in order, later sources override earlier ones:
//!
//! 1. **YAML config file** - default `config.yaml`, overridable with `-f` or `GENSTORE_CONFIG`
//! 2. **Prefixed environment variables** - `GENSTORE_` prefix, `__` for nesting
//!    (e.g. `GENSTORE_STORAGE__S3__BUCKET=media`)
//! 3. **Provider/AWS variables** - the conventional names below map onto their config keys
//!
//! | Variable                | Config key                      |
//! |-------------------------|---------------------------------|
//! | `STABILITY_API_KEY`     | `providers.image.api_key`       |
//! | `STABILITY_API_HOST`    | `providers.image.host`          |
//! | `ELEVENLABS_API_KEY`    | `providers.audio.api_key`       |
//! | `AWS_BUCKET_NAME`       | `storage.s3.bucket`             |
//! | `AWS_REGION`            | `storage.s3.region`             |
//! | `AWS_ACCESS_KEY_ID`     | `storage.s3.access_key_id`      |
//! | `AWS_SECRET_ACCESS_KEY` | `storage.s3.secret_access_key`  |
//!
//! Every credential is required. [`Config::load`] fails with a message naming the missing key
//! rather than starting a server that cannot generate anything.

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
    value::{Uncased, UncasedStr},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "GENSTORE_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Configuration could not be used to start the service
#[derive(Debug, thiserror::Error)]
#[error("Config validation: {0}")]
pub struct ConfigError(String);

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Upstream generation providers
    pub providers: ProvidersConfig,
    /// Where generated artifacts are stored
    pub storage: StorageConfig,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvidersConfig {
    pub image: ImageProviderConfig,
    pub audio: AudioProviderConfig,
    /// Per-call timeout for provider requests. Unset means calls wait indefinitely.
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<Duration>,
}

/// Stability text-to-image settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageProviderConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub host: Url,
    pub engine_id: String,
}

impl Default for ImageProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            host: Url::parse("https://api.stability.ai").expect("valid default url"),
            engine_id: "stable-diffusion-xl-1024-v1-0".to_string(),
        }
    }
}

/// ElevenLabs text-to-speech settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AudioProviderConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: Url,
    pub voice_id: String,
    pub model_id: String,
}

impl Default for AudioProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: Url::parse("https://api.elevenlabs.io").expect("valid default url"),
            voice_id: "21m00Tcm4TlvDq8ikWAM".to_string(),
            model_id: "eleven_monolingual_v1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    S3,
    Local,
}

/// Object store configuration. Only the section matching `backend` is used.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub s3: S3Config,
    pub local: LocalStorageConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct S3Config {
    pub bucket: String,
    pub region: Option<String>,
    #[serde(skip_serializing)]
    pub access_key_id: Option<String>,
    #[serde(skip_serializing)]
    pub secret_access_key: Option<String>,
    /// Custom S3-compatible endpoint; unset means AWS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<Url>,
    /// Address buckets as `{endpoint}/{bucket}` instead of `{bucket}.{endpoint}`
    pub force_path_style: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocalStorageConfig {
    /// Directory artifacts are written under
    pub path: PathBuf,
    /// URL the directory is served from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_base_url: Option<Url>,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./.genstore_data"),
            public_base_url: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            providers: ProvidersConfig::default(),
            storage: StorageConfig::default(),
            enable_otel_export: false,
        }
    }
}

/// Conventional environment variable names and the config keys they set
const PROVIDER_ENV_KEYS: &[(&str, &str)] = &[
    ("STABILITY_API_KEY", "providers.image.api_key"),
    ("STABILITY_API_HOST", "providers.image.host"),
    ("ELEVENLABS_API_KEY", "providers.audio.api_key"),
    ("AWS_BUCKET_NAME", "storage.s3.bucket"),
    ("AWS_REGION", "storage.s3.region"),
    ("AWS_ACCESS_KEY_ID", "storage.s3.access_key_id"),
    ("AWS_SECRET_ACCESS_KEY", "storage.s3.secret_access_key"),
];

fn provider_env_key(key: &UncasedStr) -> Uncased<'_> {
    PROVIDER_ENV_KEYS
        .iter()
        .find(|(env, _)| key.as_str().eq_ignore_ascii_case(env))
        .map(|(_, path)| Uncased::from_borrowed(path))
        .unwrap_or_else(|| key.as_str().into())
}

fn missing(what: &str, key: &str, env: &str) -> ConfigError {
    ConfigError(format!("{what} is not configured. Set {env} or add `{key}` to the config file."))
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Check every value the service needs to run
    pub fn validate(&self) -> Result<(), ConfigError> {
        if is_blank(&self.providers.image.api_key) {
            return Err(missing(
                "Image provider API key",
                "providers.image.api_key",
                "STABILITY_API_KEY",
            ));
        }
        if self.providers.image.engine_id.trim().is_empty() {
            return Err(ConfigError("providers.image.engine_id cannot be empty".to_string()));
        }

        if is_blank(&self.providers.audio.api_key) {
            return Err(missing(
                "Audio provider API key",
                "providers.audio.api_key",
                "ELEVENLABS_API_KEY",
            ));
        }
        if self.providers.audio.voice_id.trim().is_empty() {
            return Err(ConfigError("providers.audio.voice_id cannot be empty".to_string()));
        }
        if self.providers.audio.model_id.trim().is_empty() {
            return Err(ConfigError("providers.audio.model_id cannot be empty".to_string()));
        }

        if self.providers.request_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError(
                "providers.request_timeout must be positive; leave it unset to disable".to_string(),
            ));
        }

        match self.storage.backend {
            StorageBackend::S3 => {
                let s3 = &self.storage.s3;
                if s3.bucket.trim().is_empty() {
                    return Err(missing("S3 bucket", "storage.s3.bucket", "AWS_BUCKET_NAME"));
                }
                if is_blank(&s3.region) {
                    return Err(missing("S3 region", "storage.s3.region", "AWS_REGION"));
                }
                if is_blank(&s3.access_key_id) {
                    return Err(missing("S3 access key id", "storage.s3.access_key_id", "AWS_ACCESS_KEY_ID"));
                }
                if is_blank(&s3.secret_access_key) {
                    return Err(missing(
                        "S3 secret access key",
                        "storage.s3.secret_access_key",
                        "AWS_SECRET_ACCESS_KEY",
                    ));
                }
                if s3.force_path_style && s3.endpoint.is_none() {
                    return Err(ConfigError(
                        "storage.s3.force_path_style requires storage.s3.endpoint to be set".to_string(),
                    ));
                }
            }
            StorageBackend::Local => {
                if self.storage.local.path.as_os_str().is_empty() {
                    return Err(ConfigError("storage.local.path cannot be empty".to_string()));
                }
                if self.storage.local.public_base_url.is_none() {
                    return Err(ConfigError(
                        "storage.local.public_base_url is required for the local storage backend".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        let names: Vec<&str> = PROVIDER_ENV_KEYS.iter().map(|(env, _)| *env).collect();
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Prefixed environment variables override specific values. GENSTORE_CONFIG names
            // the file itself and is not a config key.
            .merge(Env::prefixed("GENSTORE_").ignore(&["config"]).split("__"))
            // Conventional provider and AWS variable names
            .merge(Env::raw().only(&names).map(provider_env_key))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
