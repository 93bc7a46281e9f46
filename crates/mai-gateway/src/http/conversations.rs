//! GET /api/conversations/{session_id} — turn history and semantic search
//! over a user's past sessions (spec §3/§4.3).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use mai_llm::EmbedOptions;
use mai_memory::Turn;
use serde::Deserialize;

use crate::app::AppState;
use crate::http::memory::ErrorBody;

#[derive(Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_limit() -> u32 {
    50
}

pub async fn recent_turns(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(q): Query<RecentQuery>,
) -> Result<Json<Vec<Turn>>, (StatusCode, Json<ErrorBody>)> {
    state
        .store
        .recent_turns(&session_id, q.limit)
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { error: e.to_string() })))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    user_name: String,
    q: String,
    #[serde(default = "default_limit")]
    limit: u32,
    #[serde(default = "default_min_similarity")]
    min_similarity: f32,
}

fn default_min_similarity() -> f32 {
    0.5
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<Turn>>, (StatusCode, Json<ErrorBody>)> {
    let opts = EmbedOptions { model: state.config_store.embedding_model(), ..Default::default() };
    let embedding = state
        .llm
        .embed(&q.q, &opts)
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, Json(ErrorBody { error: e.to_string() })))?;

    state
        .store
        .semantic_recall(&q.user_name, &embedding, &session_id, q.limit, q.min_similarity)
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { error: e.to_string() })))
}
