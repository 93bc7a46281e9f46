//! E-mail log inspection, admin-initiated resend, and sender→user mapping
//! (spec §4.13).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use mai_memory::EmailLog;
use serde::Deserialize;

use crate::app::AppState;
use crate::http::memory::ErrorBody;

pub async fn get_log(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<EmailLog>, (StatusCode, Json<ErrorBody>)> {
    match state.store.get_email_log(id) {
        Ok(Some(log)) => Ok(Json(log)),
        Ok(None) => Err((StatusCode::NOT_FOUND, Json(ErrorBody { error: format!("email log {id} not found") }))),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { error: e.to_string() }))),
    }
}

/// POST /api/email/logs/{id}/retry — resend a previously-failed outbound
/// message, reusing its stored body (spec §4.13, supplemented from
/// `original_source/email-summary-service/app.py`'s manual-resend path).
pub async fn retry_log(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, Json<ErrorBody>)> {
    let mut transport = state.email_transport.lock().await;
    mai_email::poller::retry_failed_send(transport.as_mut(), &state.store, &state.config.email.bot_email, id)
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(|e| (StatusCode::BAD_GATEWAY, Json(ErrorBody { error: e.to_string() })))
}

#[derive(Deserialize)]
pub struct MapAddressRequest {
    pub email_address: String,
    pub user_name: String,
}

pub async fn map_address(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MapAddressRequest>,
) -> Result<StatusCode, (StatusCode, Json<ErrorBody>)> {
    state
        .store
        .map_email_to_user(&req.email_address, &req.user_name)
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(ErrorBody { error: e.to_string() })))
}
