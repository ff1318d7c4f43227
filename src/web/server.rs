//! HTTP server implementation

use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use super::handlers::{dump_shards, read_key, run_backup, set_liveness, shard_stats, write_key};
use crate::cluster::DistributedStore;

/// Build the application router
pub fn router(store: Arc<DistributedStore>) -> Router {
    Router::new()
        .route("/keys/:key", get(read_key).put(write_key))
        .route("/shards", get(dump_shards))
        .route("/shards/stats", get(shard_stats))
        .route("/shards/:id/liveness", post(set_liveness))
        .route("/backup", post(run_backup))
        .layer(CorsLayer::permissive())
        .with_state(store)
}

/// Run the web server until `shutdown` resolves
pub async fn run_web_server<F>(
    addr: &str,
    store: Arc<DistributedStore>,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(store);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Web interface available at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
