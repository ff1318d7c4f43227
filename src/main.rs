use shardkv::{web, DistributedStore, StoreConfig};
use std::sync::Arc;
use tracing::{error, info};

const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8080";

fn load_config() -> anyhow::Result<StoreConfig> {
    // Optional JSON file as first argument, env overrides on top
    let config = match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path, e))?;
            StoreConfig::from_json(&raw)?
        }
        None => StoreConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("shardkv starting...");

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    let store = Arc::new(DistributedStore::new(config)?);
    let config = store.config();
    info!(
        "Using {} shards, backup every {} ms, failover policy {:?}",
        config.num_shards, config.backup_interval_ms, config.failover_policy
    );
    let http_addr = std::env::var("SHARDKV_HTTP_ADDR").unwrap_or_else(|_| DEFAULT_HTTP_ADDR.to_string());

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
        info!("Shutdown requested");
    };

    if let Err(e) = web::run_web_server(&http_addr, store.clone(), shutdown).await {
        error!("Web server error: {}", e);
    }

    store.shutdown().await;
    Ok(())
}
