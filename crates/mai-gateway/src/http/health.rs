//! GET /health — liveness probe plus per-channel connection status.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::app::AppState;

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let channels: Value = state
        .channel_status
        .iter()
        .map(|entry| (entry.key().clone(), format!("{:?}", entry.value())))
        .collect::<std::collections::BTreeMap<_, _>>()
        .into();

    let db_ok = state.store.health_check().is_ok();

    Json(json!({
        "status": if db_ok { "ok" } else { "degraded" },
        "database": db_ok,
        "channels": channels,
    }))
}
