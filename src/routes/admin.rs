use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{routes::AppState, services::StatsSnapshot};

/// Handler for the engine statistics endpoint
pub async fn stats(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.engine.stats().await)
}

/// Handler for the cache clear endpoint
pub async fn clear_cache(State(state): State<AppState>) -> Json<Value> {
    let evicted = state.engine.clear_cache().await;
    tracing::info!(evicted = evicted, "Result cache cleared");
    Json(json!({ "evicted": evicted }))
}
