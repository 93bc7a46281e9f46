use chrono::Utc;
use mai_core::Role;
use rusqlite::{params, OptionalExtension};

use crate::error::{MemoryError, Result};
use crate::manager::{parse_rfc3339, MemoryStore};
use crate::types::{
    AttachmentMetadata, EmailAction, EmailActionKind, EmailActionStatus, EmailActionType,
    EmailDirection, EmailLog, EmailLogStatus, EmailThread, EmailType, ThreadMessage,
};

impl MemoryStore {
    /// Find the thread a normalized subject/sender belongs to, or open one
    /// (spec §4.13 thread normalization: `Re:`/`Fwd:` chains collapse to the
    /// same `normalized_subject`).
    pub fn find_or_create_thread(
        &self,
        subject: &str,
        normalized_subject: &str,
        user_email: &str,
        mapped_user: Option<&str>,
    ) -> Result<i64> {
        let db = self.db.lock().unwrap();
        let existing: Option<i64> = db
            .query_row(
                "SELECT id FROM email_thread WHERE normalized_subject = ?1 AND user_email = ?2",
                params![normalized_subject, user_email],
                |r| r.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }

        let now = Utc::now();
        db.execute(
            "INSERT INTO email_thread
                (subject, normalized_subject, user_email, mapped_user, message_count, created_at, updated_at)
             VALUES (?1,?2,?3,?4,0,?5,?5)",
            params![subject, normalized_subject, user_email, mapped_user, now.to_rfc3339()],
        )?;
        Ok(db.last_insert_rowid())
    }

    pub fn get_thread(&self, id: i64) -> Result<Option<EmailThread>> {
        let db = self.db.lock().unwrap();
        db.query_row(
            "SELECT id, subject, normalized_subject, user_email, mapped_user,
                    first_message_id, last_message_id, message_count, created_at, updated_at
             FROM email_thread WHERE id = ?1",
            params![id],
            row_to_thread,
        )
        .optional()
        .map_err(MemoryError::from)
    }

    /// Append one message to a thread, bumping its counters and
    /// `last_message_id` (spec §3 `thread_message`).
    pub fn add_thread_message(
        &self,
        thread_id: i64,
        email_log_id: Option<i64>,
        role: Role,
        content: &str,
        message_id: Option<&str>,
    ) -> Result<i64> {
        let db = self.db.lock().unwrap();
        let now = Utc::now();
        db.execute(
            "INSERT INTO thread_message (thread_id, email_log_id, role, message_content, timestamp)
             VALUES (?1,?2,?3,?4,?5)",
            params![thread_id, email_log_id, role.to_string(), content, now.to_rfc3339()],
        )?;
        let id = db.last_insert_rowid();

        db.execute(
            "UPDATE email_thread SET message_count = message_count + 1, updated_at = ?1,
                last_message_id = COALESCE(?2, last_message_id),
                first_message_id = COALESCE(first_message_id, ?2)
             WHERE id = ?3",
            params![now.to_rfc3339(), message_id, thread_id],
        )?;
        Ok(id)
    }

    pub fn thread_messages(&self, thread_id: i64, limit: u32) -> Result<Vec<ThreadMessage>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, thread_id, email_log_id, role, message_content, timestamp
             FROM thread_message WHERE thread_id = ?1 ORDER BY timestamp ASC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![thread_id, limit], row_to_thread_message)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Record one side effect of action-synchronous extraction (spec §4.13
    /// "Action log" / §4.5 email path).
    #[allow(clippy::too_many_arguments)]
    pub fn record_email_action(
        &self,
        thread_id: i64,
        email_log_id: i64,
        action_type: EmailActionType,
        action: EmailActionKind,
        intent: &str,
        status: EmailActionStatus,
        details: serde_json::Value,
        error_message: Option<&str>,
    ) -> Result<i64> {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO email_action
                (thread_id, email_log_id, action_type, action, intent, status, details,
                 error_message, executed_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
            params![
                thread_id,
                email_log_id,
                action_type.to_string(),
                action.to_string(),
                intent,
                status.to_string(),
                details.to_string(),
                error_message,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(db.last_insert_rowid())
    }

    pub fn list_email_actions(&self, email_log_id: i64) -> Result<Vec<EmailAction>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, thread_id, email_log_id, action_type, action, intent, status, details,
                    error_message, executed_at
             FROM email_action WHERE email_log_id = ?1 ORDER BY executed_at ASC",
        )?;
        let rows = stmt
            .query_map(params![email_log_id], row_to_action)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Log one inbound or outbound e-mail (spec §3 `email_log`). Returns the
    /// log id used to key [`Self::record_email_action`] and retries.
    #[allow(clippy::too_many_arguments)]
    pub fn log_email(
        &self,
        direction: EmailDirection,
        email_type: EmailType,
        from_addr: &str,
        to_addr: &str,
        subject: &str,
        body_preview: &str,
        full_body: &str,
        status: EmailLogStatus,
        error_message: Option<&str>,
        mapped_user: Option<&str>,
        thread_id: Option<i64>,
        attachments: &[AttachmentMetadata],
    ) -> Result<i64> {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO email_log
                (direction, email_type, from_addr, to_addr, subject, body_preview, full_body,
                 status, error_message, mapped_user, thread_id, attachments_count,
                 attachments_metadata, timestamp)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)",
            params![
                direction.to_string(),
                email_type.to_string(),
                from_addr,
                to_addr,
                subject,
                body_preview,
                full_body,
                status.to_string(),
                error_message,
                mapped_user,
                thread_id,
                attachments.len() as i64,
                serde_json::to_string(attachments)?,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(db.last_insert_rowid())
    }

    pub fn get_email_log(&self, id: i64) -> Result<Option<EmailLog>> {
        let db = self.db.lock().unwrap();
        db.query_row(
            "SELECT id, direction, email_type, from_addr, to_addr, subject, body_preview,
                    full_body, status, error_message, mapped_user, thread_id,
                    attachments_count, attachments_metadata, timestamp
             FROM email_log WHERE id = ?1",
            params![id],
            row_to_log,
        )
        .optional()
        .map_err(MemoryError::from)
    }

    /// Admin-initiated resend (SPEC_FULL.md §C, supplemented from
    /// `original_source/email-summary-service/app.py`): reuses the stored
    /// body rather than regenerating it, and re-logs the attempt.
    pub fn mark_email_log_status(&self, id: i64, status: EmailLogStatus, error_message: Option<&str>) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE email_log SET status = ?1, error_message = ?2 WHERE id = ?3",
            params![status.to_string(), error_message, id],
        )?;
        Ok(())
    }

    pub fn map_email_to_user(&self, email_address: &str, user_name: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO email_mapping (email_address, user_name) VALUES (?1,?2)
             ON CONFLICT(email_address) DO UPDATE SET user_name = excluded.user_name",
            params![email_address, user_name],
        )?;
        Ok(())
    }

    pub fn resolve_user_for_email(&self, email_address: &str) -> Result<Option<String>> {
        let db = self.db.lock().unwrap();
        db.query_row(
            "SELECT user_name FROM email_mapping WHERE email_address = ?1",
            params![email_address],
            |r| r.get(0),
        )
        .optional()
        .map_err(MemoryError::from)
    }
}

fn row_to_thread(row: &rusqlite::Row) -> rusqlite::Result<EmailThread> {
    Ok(EmailThread {
        id: row.get("id")?,
        subject: row.get("subject")?,
        normalized_subject: row.get("normalized_subject")?,
        user_email: row.get("user_email")?,
        mapped_user: row.get("mapped_user")?,
        first_message_id: row.get("first_message_id")?,
        last_message_id: row.get("last_message_id")?,
        message_count: row.get::<_, i64>("message_count")? as u32,
        created_at: parse_rfc3339(&row.get::<_, String>("created_at")?),
        updated_at: parse_rfc3339(&row.get::<_, String>("updated_at")?),
    })
}

fn row_to_thread_message(row: &rusqlite::Row) -> rusqlite::Result<ThreadMessage> {
    Ok(ThreadMessage {
        id: row.get("id")?,
        thread_id: row.get("thread_id")?,
        email_log_id: row.get("email_log_id")?,
        role: row.get::<_, String>("role")?.parse().unwrap_or(Role::User),
        message_content: row.get("message_content")?,
        timestamp: parse_rfc3339(&row.get::<_, String>("timestamp")?),
    })
}

fn row_to_action(row: &rusqlite::Row) -> rusqlite::Result<EmailAction> {
    let details_json: String = row.get("details")?;
    Ok(EmailAction {
        id: row.get("id")?,
        thread_id: row.get("thread_id")?,
        email_log_id: row.get("email_log_id")?,
        action_type: row.get::<_, String>("action_type")?.parse().unwrap_or(EmailActionType::Memory),
        action: row.get::<_, String>("action")?.parse().unwrap_or(EmailActionKind::Add),
        intent: row.get("intent")?,
        status: row.get::<_, String>("status")?.parse().unwrap_or(EmailActionStatus::Skipped),
        details: serde_json::from_str(&details_json).unwrap_or(serde_json::Value::Null),
        error_message: row.get("error_message")?,
        executed_at: parse_rfc3339(&row.get::<_, String>("executed_at")?),
    })
}

fn row_to_log(row: &rusqlite::Row) -> rusqlite::Result<EmailLog> {
    let attachments_json: String = row.get("attachments_metadata")?;
    Ok(EmailLog {
        id: row.get("id")?,
        direction: row.get::<_, String>("direction")?.parse().unwrap_or(EmailDirection::Received),
        email_type: row.get::<_, String>("email_type")?.parse().unwrap_or(EmailType::Other),
        from_addr: row.get("from_addr")?,
        to_addr: row.get("to_addr")?,
        subject: row.get("subject")?,
        body_preview: row.get("body_preview")?,
        full_body: row.get("full_body")?,
        status: row.get::<_, String>("status")?.parse().unwrap_or(EmailLogStatus::Error),
        error_message: row.get("error_message")?,
        mapped_user: row.get("mapped_user")?,
        thread_id: row.get("thread_id")?,
        attachments_count: row.get::<_, i64>("attachments_count")? as u32,
        attachments_metadata: serde_json::from_str(&attachments_json).unwrap_or_default(),
        timestamp: parse_rfc3339(&row.get::<_, String>("timestamp")?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::new(rusqlite::Connection::open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn thread_lookup_collapses_re_chains() {
        let s = store();
        let t1 = s.find_or_create_thread("Re: Weekly update", "weekly update", "a@example.com", None).unwrap();
        let t2 = s.find_or_create_thread("Re: Re: Weekly update", "weekly update", "a@example.com", None).unwrap();
        assert_eq!(t1, t2);
    }

    #[test]
    fn add_message_bumps_thread_counters() {
        let s = store();
        let t = s.find_or_create_thread("hi", "hi", "a@example.com", None).unwrap();
        s.add_thread_message(t, None, Role::User, "hello", Some("<1@mail>")).unwrap();
        let thread = s.get_thread(t).unwrap().unwrap();
        assert_eq!(thread.message_count, 1);
        assert_eq!(thread.first_message_id.as_deref(), Some("<1@mail>"));
    }

    #[test]
    fn email_mapping_roundtrip() {
        let s = store();
        s.map_email_to_user("a@example.com", "alice").unwrap();
        assert_eq!(s.resolve_user_for_email("a@example.com").unwrap().as_deref(), Some("alice"));
        assert_eq!(s.resolve_user_for_email("nobody@example.com").unwrap(), None);
    }

    #[test]
    fn log_then_record_action() {
        let s = store();
        let log_id = s
            .log_email(
                EmailDirection::Received,
                EmailType::Other,
                "a@example.com",
                "bot@example.com",
                "subject",
                "preview",
                "full body",
                EmailLogStatus::Success,
                None,
                Some("alice"),
                None,
                &[],
            )
            .unwrap();
        s.record_email_action(
            0,
            log_id,
            EmailActionType::Memory,
            EmailActionKind::Add,
            "remember favorite color",
            EmailActionStatus::Success,
            serde_json::json!({"content": "favorite color is blue"}),
            None,
        )
        .unwrap();
        let actions = s.list_email_actions(log_id).unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].status, EmailActionStatus::Success);
    }
}
