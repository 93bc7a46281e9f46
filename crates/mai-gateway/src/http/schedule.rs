//! GET/POST/PATCH/DELETE /api/schedule — schedule-event CRUD (spec §4.9).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, NaiveTime, Utc};
use mai_memory::{ScheduleEvent, ScheduleEventUpdate};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::http::memory::ErrorBody;

#[derive(Deserialize)]
pub struct ListQuery {
    user_name: String,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_limit() -> u32 {
    100
}

pub async fn list_schedule(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<ScheduleEvent>>, (StatusCode, Json<ErrorBody>)> {
    let start = q.start.unwrap_or_else(|| Utc::now().date_naive());
    state
        .store
        .list_schedule(&q.user_name, start, q.end, q.limit)
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { error: e.to_string() })))
}

#[derive(Deserialize)]
pub struct UpcomingQuery {
    user_name: String,
    #[serde(default = "default_lookahead_days")]
    days: i64,
}

fn default_lookahead_days() -> i64 {
    7
}

pub async fn upcoming(
    State(state): State<Arc<AppState>>,
    Query(q): Query<UpcomingQuery>,
) -> Result<Json<Vec<ScheduleEvent>>, (StatusCode, Json<ErrorBody>)> {
    let today = Utc::now().date_naive();
    let end = today + chrono::Duration::days(q.days);
    state
        .store
        .list_schedule(&q.user_name, today, Some(end), 500)
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { error: e.to_string() })))
}

#[derive(Deserialize)]
pub struct CreateEventRequest {
    pub user_name: String,
    pub title: String,
    pub event_date: NaiveDate,
    pub event_time: Option<NaiveTime>,
    pub description: Option<String>,
    #[serde(default = "default_importance")]
    pub importance: u8,
    #[serde(default = "default_true")]
    pub reminder_enabled: bool,
    #[serde(default = "default_lead_minutes")]
    pub reminder_lead_minutes: i64,
    pub recipient_email: Option<String>,
}

fn default_importance() -> u8 {
    5
}

fn default_true() -> bool {
    true
}

fn default_lead_minutes() -> i64 {
    30
}

#[derive(Serialize)]
pub struct CreatedId {
    pub id: i64,
}

pub async fn create_event(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateEventRequest>,
) -> Result<Json<CreatedId>, (StatusCode, Json<ErrorBody>)> {
    state
        .store
        .save_schedule_event(
            &req.user_name,
            &req.title,
            req.event_date,
            req.event_time,
            req.description.as_deref(),
            req.importance,
            req.reminder_enabled,
            req.reminder_lead_minutes,
            req.recipient_email.as_deref(),
        )
        .map(|id| Json(CreatedId { id }))
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(ErrorBody { error: e.to_string() })))
}

pub async fn update_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(update): Json<ScheduleEventUpdateRequest>,
) -> Result<StatusCode, (StatusCode, Json<ErrorBody>)> {
    let update = ScheduleEventUpdate {
        title: update.title,
        event_date: update.event_date,
        event_time: update.event_time,
        description: update.description,
        importance: update.importance,
        reminder_enabled: update.reminder_enabled,
        reminder_lead_minutes: update.reminder_lead_minutes,
        recipient_email: update.recipient_email,
    };
    state
        .store
        .update_schedule_event(id, &update)
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(|e| (StatusCode::NOT_FOUND, Json(ErrorBody { error: e.to_string() })))
}

#[derive(Deserialize, Default)]
pub struct ScheduleEventUpdateRequest {
    pub title: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub event_time: Option<NaiveTime>,
    pub description: Option<String>,
    pub importance: Option<u8>,
    pub reminder_enabled: Option<bool>,
    pub reminder_lead_minutes: Option<i64>,
    pub recipient_email: Option<String>,
}

pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, Json<ErrorBody>)> {
    state
        .store
        .delete_schedule_event(id)
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(|e| (StatusCode::NOT_FOUND, Json(ErrorBody { error: e.to_string() })))
}
