//! `serve` command implementation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use contracts::{LogStore, ServerConfig, StorageKind};
use dispatcher::{FileStore, MemoryStore};
use live::MemoryPubSub;
use tracing::{info, warn};

use crate::cli::ServeArgs;
use crate::error::CliError;
use crate::server::Server;

/// Execute the `serve` command
pub async fn run_serve(args: &ServeArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    apply_overrides(&mut config, args);
    config_loader::ConfigLoader::validate(&config).context("Invalid configuration after overrides")?;

    info!(
        ingest_addr = %config.server.ingest_addr,
        tail_addr = %config.server.tail_addr,
        storage = ?config.storage.kind,
        batch_size = config.pipeline.batch_size,
        flush_interval_ms = config.pipeline.flush_interval_ms,
        tokens = config.auth.tokens.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    let pubsub = Arc::new(MemoryPubSub::new(config.live.topic_capacity));
    let shutdown_timeout = Duration::from_secs(args.shutdown_timeout);

    match config.storage.kind {
        StorageKind::File => {
            let store = FileStore::new(&config.storage.path);
            info!(path = %store.base_path().display(), "Using file storage");
            serve(&config, Arc::new(store), pubsub, shutdown_timeout).await
        }
        StorageKind::Memory => {
            warn!("Using memory storage, logs are kept only for the process lifetime");
            serve(&config, Arc::new(MemoryStore::new()), pubsub, shutdown_timeout).await
        }
    }
}

fn apply_overrides(config: &mut ServerConfig, args: &ServeArgs) {
    if let Some(ref addr) = args.ingest_addr {
        info!(addr = %addr, "Overriding ingest address from CLI");
        config.server.ingest_addr = addr.clone();
    }
    if let Some(ref addr) = args.tail_addr {
        info!(addr = %addr, "Overriding tail address from CLI");
        config.server.tail_addr = addr.clone();
    }
    if let Some(storage) = args.storage {
        info!(storage = ?storage, "Overriding storage backend from CLI");
        config.storage.kind = storage.into();
    }
    if let Some(ref path) = args.storage_path {
        config.storage.path = path.clone();
    }
}

async fn serve<S: LogStore + Sync + 'static>(
    config: &ServerConfig,
    store: Arc<S>,
    pubsub: Arc<MemoryPubSub>,
    shutdown_timeout: Duration,
) -> Result<()> {
    let server = Server::bind(config, store, pubsub, shutdown_timeout)
        .await
        .context("Failed to start listeners")?;

    let stats = server
        .run(shutdown_signal())
        .await
        .context("Server failed")?;

    stats.print_summary();
    info!("logpipe finished");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &ServerConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Listeners:");
    println!("  Ingest: {}", config.server.ingest_addr);
    println!("  Tail: {}", config.server.tail_addr);
    println!("\nAuth:");
    println!("  Internal app: {}", config.auth.internal_app);
    println!("  Tokens: {}", config.auth.tokens.len());
    println!("\nPipeline:");
    println!("  Queue capacity: {}", config.pipeline.queue_capacity);
    println!("  Batch size: {}", config.pipeline.batch_size);
    println!("  Flush interval: {}ms", config.pipeline.flush_interval_ms);
    println!("\nStorage:");
    println!("  Kind: {:?}", config.storage.kind);
    if config.storage.kind == StorageKind::File {
        println!("  Path: {}", config.storage.path.display());
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::StorageArg;
    use std::path::PathBuf;

    fn args() -> ServeArgs {
        ServeArgs {
            config: PathBuf::from("logpipe.toml"),
            ingest_addr: None,
            tail_addr: None,
            storage: None,
            storage_path: None,
            shutdown_timeout: 5,
            metrics_port: 0,
            dry_run: false,
        }
    }

    #[test]
    fn test_overrides_applied() {
        let mut config = ServerConfig::default();
        let args = ServeArgs {
            ingest_addr: Some("127.0.0.1:7000".into()),
            storage: Some(StorageArg::Memory),
            storage_path: Some(PathBuf::from("/tmp/logs")),
            ..args()
        };

        apply_overrides(&mut config, &args);

        assert_eq!(config.server.ingest_addr, "127.0.0.1:7000");
        assert_eq!(config.server.tail_addr, ServerConfig::default().server.tail_addr);
        assert_eq!(config.storage.kind, StorageKind::Memory);
        assert_eq!(config.storage.path, PathBuf::from("/tmp/logs"));
    }

    #[tokio::test]
    async fn test_missing_config_file() {
        let args = ServeArgs {
            config: PathBuf::from("/nonexistent/logpipe.toml"),
            ..args()
        };
        let err = run_serve(&args).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_dry_run_validates_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logpipe.toml");
        std::fs::write(&path, "[storage]\nkind = \"memory\"\n").unwrap();

        let args = ServeArgs {
            config: path,
            dry_run: true,
            ..args()
        };
        run_serve(&args).await.unwrap();
    }
}
