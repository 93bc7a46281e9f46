//! GET/POST /api/settings — the persona/model/timeout KV store (spec §4.4),
//! plus the e-mail channel's own settings record.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use mai_memory::EmailSettings;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::http::memory::ErrorBody;

#[derive(Serialize)]
pub struct SettingEntry {
    pub key: String,
    pub value: String,
}

pub async fn list_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SettingEntry>>, (StatusCode, Json<ErrorBody>)> {
    state
        .store
        .all_config_values()
        .map(|rows| Json(rows.into_iter().map(|(key, value)| SettingEntry { key, value }).collect()))
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { error: e.to_string() })))
}

#[derive(Deserialize)]
pub struct SetSettingRequest {
    pub key: String,
    pub value: String,
}

pub async fn set_setting(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SetSettingRequest>,
) -> Result<StatusCode, (StatusCode, Json<ErrorBody>)> {
    state
        .config_store
        .set(&req.key, &req.value)
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(ErrorBody { error: e.to_string() })))
}

pub async fn get_email_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<EmailSettings>, (StatusCode, Json<ErrorBody>)> {
    state
        .store
        .get_email_settings()
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { error: e.to_string() })))
}

pub async fn put_email_settings(
    State(state): State<Arc<AppState>>,
    Json(settings): Json<EmailSettings>,
) -> Result<StatusCode, (StatusCode, Json<ErrorBody>)> {
    state
        .store
        .save_email_settings(&settings)
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(ErrorBody { error: e.to_string() })))
}
