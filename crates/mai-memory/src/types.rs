use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use mai_core::{MemoryCategory, Modality, Role, TopicState};
use serde::{Deserialize, Serialize};

/// One row of `conversation turn` (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: i64,
    pub user_name: String,
    pub channel_session: String,
    pub logical_session_id: String,
    pub modality: Modality,
    pub role: Role,
    pub message: String,
    pub embedding: Option<Vec<f32>>,
    pub timestamp: DateTime<Utc>,
    pub topic_state: Option<TopicState>,
    pub topic_summary: Option<String>,
    pub consolidated_at: Option<DateTime<Utc>>,
    pub consolidated_summary_id: Option<i64>,
}

/// A persisted, user-attributed memory (spec §3 `persistent_memory`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistentMemory {
    pub id: i64,
    pub user_name: String,
    pub category: MemoryCategory,
    pub content: String,
    pub importance: u8,
    pub tags: Vec<String>,
    pub event_date: Option<NaiveDate>,
    pub event_time: Option<NaiveTime>,
    pub extracted_at: DateTime<Utc>,
    pub source_session_id: Option<String>,
    pub active: bool,
}

/// A first-class calendar row (spec §3 `schedule_event`), distinct from
/// schedule-category memories which may mirror it (GLOSSARY).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEvent {
    pub id: i64,
    pub user_name: String,
    pub title: String,
    pub event_date: NaiveDate,
    pub event_time: Option<NaiveTime>,
    pub description: Option<String>,
    pub importance: u8,
    pub active: bool,
    pub reminder_enabled: bool,
    pub reminder_lead_minutes: i64,
    pub recipient_email: Option<String>,
    pub reminder_sent: bool,
    pub reminder_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Draft fields for creating/updating a schedule event — deliberately
/// separate from [`ScheduleEvent`] so callers can't forge `id`/`active`.
#[derive(Debug, Clone, Default)]
pub struct ScheduleEventUpdate {
    pub title: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub event_time: Option<NaiveTime>,
    pub description: Option<String>,
    pub importance: Option<u8>,
    pub reminder_enabled: Option<bool>,
    pub reminder_lead_minutes: Option<i64>,
    pub recipient_email: Option<String>,
}

/// A logical session (spec §3 `logical_session`). Owned end-to-end by
/// `mai-memory`; `mai-sessions` only keeps the fast in-memory map on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRow {
    pub session_id: String,
    pub user_name: String,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub message_count: u32,
    pub state: mai_core::SessionState,
}

/// E-mail thread grouping (spec §3 `email_thread`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailThread {
    pub id: i64,
    pub subject: String,
    pub normalized_subject: String,
    pub user_email: String,
    pub mapped_user: Option<String>,
    pub first_message_id: Option<String>,
    pub last_message_id: Option<String>,
    pub message_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One message within an [`EmailThread`] (spec §3 `thread_message`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: i64,
    pub thread_id: i64,
    pub email_log_id: Option<i64>,
    pub role: Role,
    pub message_content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailActionType {
    Memory,
    Schedule,
}

impl fmt::Display for EmailActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if *self == Self::Memory { "memory" } else { "schedule" })
    }
}

impl FromStr for EmailActionType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(Self::Memory),
            "schedule" => Ok(Self::Schedule),
            other => Err(format!("unknown email action type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailActionKind {
    Add,
    Update,
    Delete,
}

impl fmt::Display for EmailActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Add => "add",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

impl FromStr for EmailActionKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(Self::Add),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(format!("unknown email action kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailActionStatus {
    Success,
    Failed,
    Skipped,
}

impl fmt::Display for EmailActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        write!(f, "{s}")
    }
}

impl FromStr for EmailActionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "skipped" => Ok(Self::Skipped),
            other => Err(format!("unknown email action status: {other}")),
        }
    }
}

/// One attempted side effect from the action-synchronous extraction
/// (spec §3 `email_action`, GLOSSARY "Action log").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailAction {
    pub id: i64,
    pub thread_id: i64,
    pub email_log_id: i64,
    pub action_type: EmailActionType,
    pub action: EmailActionKind,
    pub intent: String,
    pub status: EmailActionStatus,
    pub details: serde_json::Value,
    pub error_message: Option<String>,
    pub executed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailDirection {
    Received,
    Sent,
}

impl fmt::Display for EmailDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if *self == Self::Received { "received" } else { "sent" })
    }
}

impl FromStr for EmailDirection {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "received" => Ok(Self::Received),
            "sent" => Ok(Self::Sent),
            other => Err(format!("unknown email direction: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailType {
    Summary,
    Reply,
    Test,
    Reminder,
    Other,
}

impl fmt::Display for EmailType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Summary => "summary",
            Self::Reply => "reply",
            Self::Test => "test",
            Self::Reminder => "reminder",
            Self::Other => "other",
        };
        write!(f, "{s}")
    }
}

impl FromStr for EmailType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "summary" => Ok(Self::Summary),
            "reply" => Ok(Self::Reply),
            "test" => Ok(Self::Test),
            "reminder" => Ok(Self::Reminder),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown email type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailLogStatus {
    Success,
    Error,
}

impl fmt::Display for EmailLogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if *self == Self::Success { "success" } else { "error" })
    }
}

impl FromStr for EmailLogStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown email log status: {other}")),
        }
    }
}

/// A single attachment's extracted metadata (spec §3 `attachments_metadata`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentMetadata {
    pub filename: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub size: u64,
    pub preview: String,
}

/// One row of `email_log` (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailLog {
    pub id: i64,
    pub direction: EmailDirection,
    pub email_type: EmailType,
    pub from_addr: String,
    pub to_addr: String,
    pub subject: String,
    pub body_preview: String,
    pub full_body: String,
    pub status: EmailLogStatus,
    pub error_message: Option<String>,
    pub mapped_user: Option<String>,
    pub thread_id: Option<i64>,
    pub attachments_count: u32,
    pub attachments_metadata: Vec<AttachmentMetadata>,
    pub timestamp: DateTime<Utc>,
}

/// Result of `MemoryStore::consolidate_before` (spec §4.3 Consolidation).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ConsolidationResult {
    pub messages_consolidated: u32,
    pub summaries_created: u32,
}

/// The single-row `email_settings` table (spec §4.14 Configuration).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailSettings {
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_use_ssl: bool,
    pub smtp_use_tls: bool,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub imap_host: Option<String>,
    pub imap_port: Option<u16>,
    pub imap_mailbox: String,
    pub imap_username: Option<String>,
    pub imap_password: Option<String>,
    pub summary_time: String,
    pub summary_timezone: String,
    /// Destination address for the daily digest (spec §4.14); distinct from
    /// any per-event `recipient_email` override on `schedule_event`.
    pub summary_recipient: Option<String>,
    pub last_summary_sent_date: Option<NaiveDate>,
}
