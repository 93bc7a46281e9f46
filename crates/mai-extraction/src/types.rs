use chrono::{NaiveDate, NaiveTime};
use mai_core::MemoryCategory;

/// One validated memory pulled from a user turn, ready for
/// `MemoryStore::save_persistent_memory` (spec §4.5).
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedMemory {
    pub category: MemoryCategory,
    pub content: String,
    pub importance: u8,
    pub event_date: Option<NaiveDate>,
    pub event_time: Option<NaiveTime>,
}

/// The action a schedule extraction resolved to (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleAction {
    Add,
    Update,
    Delete,
    Nothing,
}

impl ScheduleAction {
    fn parse(raw: &str) -> Self {
        match raw.to_uppercase().as_str() {
            "ADD" => Self::Add,
            "UPDATE" => Self::Update,
            "DELETE" => Self::Delete,
            _ => Self::Nothing,
        }
    }
}

/// Result of running the schedule extractor over a single turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleExtraction {
    pub action: ScheduleAction,
    pub title: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub event_time: Option<NaiveTime>,
    pub description: Option<String>,
    pub importance: u8,
    /// Resolved by title substring match against the user's active events
    /// (spec §4.5) — never taken verbatim from the LLM.
    pub event_id: Option<i64>,
}

impl ScheduleExtraction {
    pub fn nothing() -> Self {
        Self {
            action: ScheduleAction::Nothing,
            title: None,
            event_date: None,
            event_time: None,
            description: None,
            importance: 5,
            event_id: None,
        }
    }
}

/// Raw shape of one memory-extraction JSON element, before validation.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct RawMemory {
    pub category: Option<String>,
    pub content: Option<String>,
    pub importance: Option<serde_json::Value>,
    pub date_expression: Option<String>,
    pub event_time: Option<String>,
}

/// Raw shape of the schedule-extraction JSON object, before validation.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct RawSchedule {
    pub action: Option<String>,
    pub title: Option<String>,
    pub date_expression: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub description: Option<String>,
    pub importance: Option<serde_json::Value>,
}

impl RawSchedule {
    pub fn action(&self) -> ScheduleAction {
        self.action.as_deref().map(ScheduleAction::parse).unwrap_or(ScheduleAction::Nothing)
    }

    pub fn date_expression(&self) -> Option<&str> {
        self.date_expression.as_deref().or(self.date.as_deref())
    }
}

pub(crate) fn coerce_importance(value: Option<&serde_json::Value>) -> u8 {
    let parsed = match value {
        Some(serde_json::Value::Number(n)) => n.as_i64(),
        Some(serde_json::Value::String(s)) => s.parse::<i64>().ok(),
        _ => None,
    };
    parsed.map(|v| v.clamp(1, 10) as u8).unwrap_or(5)
}

pub(crate) fn coerce_time(raw: Option<&str>) -> Option<NaiveTime> {
    raw.and_then(|s| NaiveTime::parse_from_str(s.trim(), "%H:%M").ok())
}
