use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::error::{MemoryError, Result};
use crate::manager::{parse_rfc3339, MemoryStore};
use crate::types::{ScheduleEvent, ScheduleEventUpdate};

impl MemoryStore {
    /// Create a schedule event, or merge into an exact `(user, title,
    /// event_date)` match if one already exists: fills a missing
    /// `event_time`/`description` and raises `importance` if higher, never
    /// lowers it or clears a field the existing row already has (spec §4.9
    /// dedup).
    #[allow(clippy::too_many_arguments)]
    pub fn save_schedule_event(
        &self,
        user_name: &str,
        title: &str,
        event_date: NaiveDate,
        event_time: Option<NaiveTime>,
        description: Option<&str>,
        importance: u8,
        reminder_enabled: bool,
        reminder_lead_minutes: i64,
        recipient_email: Option<&str>,
    ) -> Result<i64> {
        let importance = importance.clamp(1, 10);
        let db = self.db.lock().unwrap();

        let existing = db
            .query_row(
                "SELECT id, event_time, description, importance FROM schedule_event
                 WHERE user_name = ?1 AND title = ?2 AND event_date = ?3 AND active = 1",
                params![user_name, title, event_date.to_string()],
                |r| {
                    Ok((
                        r.get::<_, i64>(0)?,
                        r.get::<_, Option<String>>(1)?,
                        r.get::<_, Option<String>>(2)?,
                        r.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;
        if let Some((id, existing_time, existing_description, existing_importance)) = existing {
            let merged_time = existing_time.or_else(|| event_time.map(|t| t.to_string()));
            let merged_description = existing_description.or_else(|| description.map(str::to_string));
            let merged_importance = existing_importance.max(importance as i64);
            db.execute(
                "UPDATE schedule_event SET event_time = ?1, description = ?2, importance = ?3,
                    updated_at = ?4 WHERE id = ?5",
                params![merged_time, merged_description, merged_importance, Utc::now().to_rfc3339(), id],
            )?;
            return Ok(id);
        }

        let now = Utc::now();
        db.execute(
            "INSERT INTO schedule_event
                (user_name, title, event_date, event_time, description, importance, active,
                 reminder_enabled, reminder_lead_minutes, recipient_email, reminder_sent,
                 created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,1,?7,?8,?9,0,?10,?10)",
            params![
                user_name,
                title,
                event_date.to_string(),
                event_time.map(|t| t.to_string()),
                description,
                importance,
                reminder_enabled as i64,
                reminder_lead_minutes,
                recipient_email,
                now.to_rfc3339(),
            ],
        )?;
        let id = db.last_insert_rowid();
        sync_fts(&db, id, title)?;
        Ok(id)
    }

    pub fn get_schedule_event(&self, id: i64) -> Result<Option<ScheduleEvent>> {
        let db = self.db.lock().unwrap();
        db.query_row(
            "SELECT id, user_name, title, event_date, event_time, description, importance,
                    active, reminder_enabled, reminder_lead_minutes, recipient_email,
                    reminder_sent, reminder_sent_at, created_at, updated_at
             FROM schedule_event WHERE id = ?1",
            params![id],
            row_to_event,
        )
        .optional()
        .map_err(MemoryError::from)
    }

    /// Partial update. Only the fields set in `update` change; `id` and
    /// `active` cannot be forged through this path (spec §4.9).
    pub fn update_schedule_event(&self, id: i64, update: &ScheduleEventUpdate) -> Result<()> {
        let db = self.db.lock().unwrap();
        let current = db
            .query_row(
                "SELECT id, user_name, title, event_date, event_time, description, importance,
                        active, reminder_enabled, reminder_lead_minutes, recipient_email,
                        reminder_sent, reminder_sent_at, created_at, updated_at
                 FROM schedule_event WHERE id = ?1",
                params![id],
                row_to_event,
            )
            .optional()?
            .ok_or(MemoryError::EventNotFound { id })?;

        let title = update.title.clone().unwrap_or(current.title);
        let event_date = update.event_date.unwrap_or(current.event_date);
        let event_time = update.event_time.or(current.event_time);
        let description = update.description.clone().or(current.description);
        let importance = update.importance.unwrap_or(current.importance).clamp(1, 10);
        let reminder_enabled = update.reminder_enabled.unwrap_or(current.reminder_enabled);
        let reminder_lead_minutes = update.reminder_lead_minutes.unwrap_or(current.reminder_lead_minutes);
        let recipient_email = update.recipient_email.clone().or(current.recipient_email);

        db.execute(
            "UPDATE schedule_event SET
                title = ?1, event_date = ?2, event_time = ?3, description = ?4,
                importance = ?5, reminder_enabled = ?6, reminder_lead_minutes = ?7,
                recipient_email = ?8, updated_at = ?9,
                reminder_sent = CASE WHEN event_date != ?2 OR event_time IS NOT ?3 THEN 0 ELSE reminder_sent END
             WHERE id = ?10",
            params![
                title,
                event_date.to_string(),
                event_time.map(|t| t.to_string()),
                description,
                importance,
                reminder_enabled as i64,
                reminder_lead_minutes,
                recipient_email,
                Utc::now().to_rfc3339(),
                id,
            ],
        )?;
        sync_fts(&db, id, &title)?;
        Ok(())
    }

    /// Soft delete — `active = 0`, row kept for audit (spec §3).
    pub fn delete_schedule_event(&self, id: i64) -> Result<()> {
        let db = self.db.lock().unwrap();
        let changed = db.execute(
            "UPDATE schedule_event SET active = 0, updated_at = ?1 WHERE id = ?2 AND active = 1",
            params![Utc::now().to_rfc3339(), id],
        )?;
        if changed == 0 {
            return Err(MemoryError::EventNotFound { id });
        }
        Ok(())
    }

    pub fn mark_reminder_sent(&self, id: i64) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE schedule_event SET reminder_sent = 1, reminder_sent_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), id],
        )?;
        Ok(())
    }

    /// Active events for `user_name` in `[start, end]`, ascending by date
    /// (spec §4.9 listing). `end = None` means unbounded future.
    pub fn list_schedule(
        &self,
        user_name: &str,
        start: NaiveDate,
        end: Option<NaiveDate>,
        limit: u32,
    ) -> Result<Vec<ScheduleEvent>> {
        let db = self.db.lock().unwrap();
        let end = end.unwrap_or(NaiveDate::MAX);
        let mut stmt = db.prepare(
            "SELECT id, user_name, title, event_date, event_time, description, importance,
                    active, reminder_enabled, reminder_lead_minutes, recipient_email,
                    reminder_sent, reminder_sent_at, created_at, updated_at
             FROM schedule_event
             WHERE user_name = ?1 AND active = 1 AND event_date BETWEEN ?2 AND ?3
             ORDER BY event_date ASC, event_time ASC
             LIMIT ?4",
        )?;
        let rows = stmt
            .query_map(params![user_name, start.to_string(), end.to_string(), limit], row_to_event)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// All active events due for a reminder sweep — read by the scheduler's
    /// reminder loop (spec §4.10), never mutated by it except via
    /// [`Self::mark_reminder_sent`].
    pub fn reminder_candidates(&self, on_or_after: NaiveDate) -> Result<Vec<ScheduleEvent>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, user_name, title, event_date, event_time, description, importance,
                    active, reminder_enabled, reminder_lead_minutes, recipient_email,
                    reminder_sent, reminder_sent_at, created_at, updated_at
             FROM schedule_event
             WHERE active = 1 AND reminder_enabled = 1 AND reminder_sent = 0
               AND event_date >= ?1",
        )?;
        let rows = stmt
            .query_map(params![on_or_after.to_string()], row_to_event)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// All active events for a user, used by `mai-scheduler`'s semantic and
    /// fuzzy search tiers as their candidate pool (C9 delegates reading here
    /// rather than `mai-memory` depending on the scheduler).
    pub fn all_active_events(&self, user_name: &str) -> Result<Vec<ScheduleEvent>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, user_name, title, event_date, event_time, description, importance,
                    active, reminder_enabled, reminder_lead_minutes, recipient_email,
                    reminder_sent, reminder_sent_at, created_at, updated_at
             FROM schedule_event WHERE user_name = ?1 AND active = 1",
        )?;
        let rows = stmt
            .query_map(params![user_name], row_to_event)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Active events across every user in `[start, end]`, for the daily
    /// summary's "next 7 days of events" aggregate (spec §4.14).
    pub fn events_between_all_users(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<ScheduleEvent>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, user_name, title, event_date, event_time, description, importance,
                    active, reminder_enabled, reminder_lead_minutes, recipient_email,
                    reminder_sent, reminder_sent_at, created_at, updated_at
             FROM schedule_event
             WHERE active = 1 AND event_date BETWEEN ?1 AND ?2
             ORDER BY event_date ASC, event_time ASC",
        )?;
        let rows = stmt
            .query_map(params![start.to_string(), end.to_string()], row_to_event)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Events created or changed since `cutoff`, across every user, for the
    /// daily summary's "schedule changes" aggregate (spec §4.14).
    pub fn events_updated_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<ScheduleEvent>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, user_name, title, event_date, event_time, description, importance,
                    active, reminder_enabled, reminder_lead_minutes, recipient_email,
                    reminder_sent, reminder_sent_at, created_at, updated_at
             FROM schedule_event
             WHERE updated_at >= ?1
             ORDER BY updated_at ASC",
        )?;
        let rows = stmt
            .query_map(params![cutoff.to_rfc3339()], row_to_event)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// FTS5 title search, used as the diagnostic-only third tier in C9's
    /// three-tier search (spec §4.9) — never the sole source of a result.
    pub fn fts_search_titles(&self, user_name: &str, query: &str, limit: u32) -> Result<Vec<i64>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT schedule_event.id FROM schedule_event_fts
             JOIN schedule_event ON schedule_event.id = schedule_event_fts.rowid
             WHERE schedule_event_fts MATCH ?1 AND schedule_event.user_name = ?2
               AND schedule_event.active = 1
             ORDER BY rank LIMIT ?3",
        )?;
        let rows = stmt
            .query_map(params![query, user_name, limit], |r| r.get(0))
            .optional_on_syntax_error()?;
        Ok(rows.unwrap_or_default())
    }
}

/// FTS5 MATCH query syntax rejects some user input (bare punctuation, stray
/// operators); this tier is diagnostic-only so a syntax error degrades to
/// "no matches" rather than bubbling up.
trait OptionalOnSyntaxError<T> {
    fn optional_on_syntax_error(self) -> Result<Option<T>>;
}

impl<T> OptionalOnSyntaxError<T> for std::result::Result<T, rusqlite::Error> {
    fn optional_on_syntax_error(self) -> Result<Option<T>> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::SqliteFailure(_, _)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn sync_fts(db: &rusqlite::Connection, id: i64, title: &str) -> Result<()> {
    db.execute(
        "INSERT INTO schedule_event_fts(schedule_event_fts, rowid, title) VALUES('delete', ?1, ?2)",
        params![id, title],
    )
    .ok();
    db.execute(
        "INSERT INTO schedule_event_fts(rowid, title) VALUES (?1, ?2)",
        params![id, title],
    )?;
    Ok(())
}

fn row_to_event(row: &rusqlite::Row) -> rusqlite::Result<ScheduleEvent> {
    let event_date: String = row.get("event_date")?;
    let event_time: Option<String> = row.get("event_time")?;
    let reminder_sent_at: Option<String> = row.get("reminder_sent_at")?;

    Ok(ScheduleEvent {
        id: row.get("id")?,
        user_name: row.get("user_name")?,
        title: row.get("title")?,
        event_date: NaiveDate::parse_from_str(&event_date, "%Y-%m-%d").unwrap_or_default(),
        event_time: event_time.and_then(|t| NaiveTime::parse_from_str(&t, "%H:%M:%S").ok()),
        description: row.get("description")?,
        importance: row.get::<_, i64>("importance")? as u8,
        active: row.get::<_, i64>("active")? != 0,
        reminder_enabled: row.get::<_, i64>("reminder_enabled")? != 0,
        reminder_lead_minutes: row.get("reminder_lead_minutes")?,
        recipient_email: row.get("recipient_email")?,
        reminder_sent: row.get::<_, i64>("reminder_sent")? != 0,
        reminder_sent_at: reminder_sent_at.map(|s| parse_rfc3339(&s)),
        created_at: parse_rfc3339(&row.get::<_, String>("created_at")?),
        updated_at: parse_rfc3339(&row.get::<_, String>("updated_at")?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::new(rusqlite::Connection::open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn save_schedule_event_is_idempotent_on_title_and_date() {
        let s = store();
        let date = NaiveDate::from_ymd_opt(2025, 10, 24).unwrap();
        let id1 = s.save_schedule_event("alice", "dentist", date, None, None, 5, true, 30, None).unwrap();
        let id2 = s.save_schedule_event("alice", "dentist", date, None, None, 8, true, 30, None).unwrap();
        assert_eq!(id1, id2);
    }

    #[test]
    fn update_then_list_reflects_new_date() {
        let s = store();
        let date = NaiveDate::from_ymd_opt(2025, 10, 24).unwrap();
        let id = s.save_schedule_event("alice", "dentist", date, None, None, 5, true, 30, None).unwrap();
        let new_date = NaiveDate::from_ymd_opt(2025, 10, 25).unwrap();
        s.update_schedule_event(id, &ScheduleEventUpdate { event_date: Some(new_date), ..Default::default() }).unwrap();
        let events = s.list_schedule("alice", new_date, Some(new_date), 10).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "dentist");
    }

    #[test]
    fn delete_is_soft_and_excluded_from_listing() {
        let s = store();
        let date = NaiveDate::from_ymd_opt(2025, 10, 24).unwrap();
        let id = s.save_schedule_event("alice", "dentist", date, None, None, 5, true, 30, None).unwrap();
        s.delete_schedule_event(id).unwrap();
        let events = s.list_schedule("alice", date, Some(date), 10).unwrap();
        assert!(events.is_empty());
        assert!(s.get_schedule_event(id).unwrap().unwrap().active == false);
    }

    #[test]
    fn update_missing_event_errors() {
        let s = store();
        let err = s.update_schedule_event(999, &ScheduleEventUpdate::default()).unwrap_err();
        assert!(matches!(err, MemoryError::EventNotFound { id: 999 }));
    }

    #[test]
    fn reminder_candidates_excludes_sent() {
        let s = store();
        let date = NaiveDate::from_ymd_opt(2025, 10, 24).unwrap();
        let id = s.save_schedule_event("alice", "dentist", date, None, None, 5, true, 30, None).unwrap();
        assert_eq!(s.reminder_candidates(date).unwrap().len(), 1);
        s.mark_reminder_sent(id).unwrap();
        assert_eq!(s.reminder_candidates(date).unwrap().len(), 0);
    }
}
