use clap::Parser;
use genstore::config::{Args, StorageBackend};
use genstore::{Application, Config, telemetry};
use std::future::pending;

/// Resolves with the name of the first termination signal received. A handler that cannot be
/// installed never fires, leaving the other one in charge.
async fn termination_signal() -> &'static str {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Ctrl+C handler unavailable");
            pending::<()>().await;
        }
        "SIGINT"
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                pending::<()>().await;
            }
        }
        "SIGTERM"
    };

    #[cfg(not(unix))]
    let terminate = pending::<&'static str>();

    tokio::select! {
        name = interrupt => name,
        name = terminate => name,
    }
}

/// One-line view of the effective settings, without credentials
fn describe(config: &Config) -> String {
    let storage = match config.storage.backend {
        StorageBackend::S3 => format!("s3 bucket {}", config.storage.s3.bucket),
        StorageBackend::Local => format!("local dir {}", config.storage.local.path.display()),
    };
    format!(
        "listen {}, image engine {}, voice {}, {}",
        config.bind_address(),
        config.providers.image.engine_id,
        config.providers.audio.voice_id,
        storage
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    genstore::install_crypto_provider();

    let args = Args::parse();
    let config = Config::load(&args)?;

    if args.validate {
        println!("Configuration is valid: {}", describe(&config));
        return Ok(());
    }

    telemetry::init_telemetry(config.enable_otel_export)?;
    tracing::info!(config_file = %args.config, "{}", describe(&config));

    let app = Application::new(config).await?;
    app.serve(async {
        let name = termination_signal().await;
        tracing::info!(signal = name, "Shutting down gracefully");
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_names_backend_and_omits_secrets() {
        let mut config = Config::default();
        config.port = 8080;
        config.storage.s3.bucket = "media".to_string();
        config.storage.s3.secret_access_key = Some("shh-secret".to_string());
        config.providers.image.api_key = Some("sk-image".to_string());

        let line = describe(&config);
        assert_eq!(
            line,
            "listen 0.0.0.0:8080, image engine stable-diffusion-xl-1024-v1-0, voice 21m00Tcm4TlvDq8ikWAM, s3 bucket media"
        );
        assert!(!line.contains("shh-secret") && !line.contains("sk-image"));

        config.storage.backend = StorageBackend::Local;
        config.storage.local.path = "/srv/media".into();
        assert!(describe(&config).ends_with("local dir /srv/media"));
    }
}
