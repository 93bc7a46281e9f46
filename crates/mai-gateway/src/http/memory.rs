//! GET/POST /api/memories — persistent-memory CRUD (spec §4.6/§3).

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, NaiveTime};
use mai_core::MemoryCategory;
use mai_memory::PersistentMemory;
use serde::{Deserialize, Serialize};

use crate::app::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    user_name: String,
    #[serde(default)]
    exclude_schedule: bool,
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_limit() -> u32 {
    50
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub async fn list_memories(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<PersistentMemory>>, (StatusCode, Json<ErrorBody>)> {
    state
        .store
        .list_memories(&q.user_name, q.exclude_schedule, q.limit)
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { error: e.to_string() })))
}

#[derive(Deserialize)]
pub struct CreateMemoryRequest {
    pub user_name: String,
    pub category: MemoryCategory,
    pub content: String,
    #[serde(default = "default_importance")]
    pub importance: u8,
    pub event_date: Option<NaiveDate>,
    pub event_time: Option<NaiveTime>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub source_session: Option<String>,
}

fn default_importance() -> u8 {
    5
}

#[derive(Serialize)]
pub struct CreatedId {
    pub id: i64,
}

pub async fn create_memory(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMemoryRequest>,
) -> Result<Json<CreatedId>, (StatusCode, Json<ErrorBody>)> {
    state
        .store
        .save_persistent_memory(
            &req.user_name,
            req.category,
            &req.content,
            req.importance,
            req.event_date,
            req.event_time,
            &req.tags,
            req.source_session.as_deref(),
        )
        .map(|id| Json(CreatedId { id }))
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(ErrorBody { error: e.to_string() })))
}
