//! HTTP handlers for the diagnostics interface

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::cluster::{DistributedStore, ShardDump};
use crate::error::StoreError;

/// Shared application state
pub type AppState = Arc<DistributedStore>;

/// Request body for writes
#[derive(Debug, Deserialize)]
pub struct WriteRequest {
    pub value: String,
}

/// Request body for liveness changes
#[derive(Debug, Deserialize)]
pub struct LivenessRequest {
    pub alive: bool,
}

/// Response for reads
#[derive(Debug, Serialize)]
pub struct ValueResponse {
    pub key: String,
    pub value: String,
}

/// Error payload
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// One shard in the `/shards` listing
#[derive(Debug, Serialize)]
pub struct ShardView {
    pub shard_id: usize,
    pub alive: bool,
    pub entries: BTreeMap<String, String>,
}

impl From<ShardDump> for ShardView {
    fn from(dump: ShardDump) -> Self {
        let entries = dump
            .snapshot
            .iter()
            .map(|(key, entry)| (key.to_string(), String::from_utf8_lossy(&entry.value).into_owned()))
            .collect();
        ShardView {
            shard_id: dump.shard_id,
            alive: dump.alive,
            entries,
        }
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = match self {
            StoreError::NotFound { .. } | StoreError::UnknownShard { .. } => StatusCode::NOT_FOUND,
            StoreError::ShardUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            StoreError::Config(_) => StatusCode::BAD_REQUEST,
            StoreError::ShardClosed { .. } | StoreError::WorkerSpawn { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

/// Read a key
pub async fn read_key(
    State(store): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ValueResponse>, StoreError> {
    debug!("HTTP read '{}'", key);
    let value = store.read(&key).await?;
    Ok(Json(ValueResponse {
        key,
        value: String::from_utf8_lossy(&value).into_owned(),
    }))
}

/// Write a key
pub async fn write_key(
    State(store): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<WriteRequest>,
) -> Result<StatusCode, StoreError> {
    debug!("HTTP write '{}'", key);
    store.write(key, req.value).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Dump every shard
pub async fn dump_shards(State(store): State<AppState>) -> Result<Json<Vec<ShardView>>, StoreError> {
    let dump = store.dump().await?;
    Ok(Json(dump.into_iter().map(ShardView::from).collect()))
}

/// Get detailed shard statistics
pub async fn shard_stats(State(store): State<AppState>) -> impl IntoResponse {
    store.stats().await.map(Json)
}

/// Mark a shard alive or failed
pub async fn set_liveness(
    State(store): State<AppState>,
    Path(shard_id): Path<usize>,
    Json(req): Json<LivenessRequest>,
) -> Result<StatusCode, StoreError> {
    store.simulate_failure(shard_id, req.alive)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Run one backup cycle
pub async fn run_backup(State(store): State<AppState>) -> impl IntoResponse {
    Json(store.run_backup_cycle().await)
}
