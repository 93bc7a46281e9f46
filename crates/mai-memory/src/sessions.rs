use chrono::{DateTime, Duration, Utc};
use mai_core::SessionState;
use rusqlite::{params, OptionalExtension};

use crate::error::{MemoryError, Result};
use crate::manager::{parse_rfc3339, MemoryStore};
use crate::types::SessionRow;

impl MemoryStore {
    pub fn create_session(&self, session_id: &str, user_name: &str) -> Result<SessionRow> {
        let db = self.db.lock().unwrap();
        let now = Utc::now();
        db.execute(
            "INSERT INTO logical_session (session_id, user_name, started_at, last_activity, message_count, state)
             VALUES (?1,?2,?3,?3,0,'active')",
            params![session_id, user_name, now.to_rfc3339()],
        )?;
        Ok(SessionRow {
            session_id: session_id.to_string(),
            user_name: user_name.to_string(),
            started_at: now,
            last_activity: now,
            message_count: 0,
            state: SessionState::Active,
        })
    }

    pub fn get_session(&self, session_id: &str) -> Result<Option<SessionRow>> {
        let db = self.db.lock().unwrap();
        db.query_row(
            "SELECT session_id, user_name, started_at, last_activity, message_count, state
             FROM logical_session WHERE session_id = ?1",
            params![session_id],
            row_to_session,
        )
        .optional()
        .map_err(MemoryError::from)
    }

    /// Most recently active `active`-state session for a user, used by
    /// `mai-sessions`' lookup step 2 (spec §4.8).
    pub fn find_active_session(&self, user_name: &str) -> Result<Option<SessionRow>> {
        let db = self.db.lock().unwrap();
        db.query_row(
            "SELECT session_id, user_name, started_at, last_activity, message_count, state
             FROM logical_session
             WHERE user_name = ?1 AND state = 'active'
             ORDER BY last_activity DESC LIMIT 1",
            params![user_name],
            row_to_session,
        )
        .optional()
        .map_err(MemoryError::from)
    }

    /// Most recently `idle` session still within `reactivation_window` of
    /// its last activity, used by lookup step 3 (spec §4.8).
    pub fn find_reactivatable_session(
        &self,
        user_name: &str,
        now: DateTime<Utc>,
        reactivation_window: Duration,
    ) -> Result<Option<SessionRow>> {
        let db = self.db.lock().unwrap();
        let cutoff = now - reactivation_window;
        db.query_row(
            "SELECT session_id, user_name, started_at, last_activity, message_count, state
             FROM logical_session
             WHERE user_name = ?1 AND state = 'idle' AND last_activity >= ?2
             ORDER BY last_activity DESC LIMIT 1",
            params![user_name, cutoff.to_rfc3339()],
            row_to_session,
        )
        .optional()
        .map_err(MemoryError::from)
    }

    /// Bump `last_activity`, increment `message_count`, and reactivate an
    /// idle session back to `active` (spec §4.8).
    pub fn touch_session(&self, session_id: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        let changed = db.execute(
            "UPDATE logical_session
             SET last_activity = ?1, message_count = message_count + 1, state = 'active'
             WHERE session_id = ?2",
            params![Utc::now().to_rfc3339(), session_id],
        )?;
        if changed == 0 {
            return Err(MemoryError::SessionNotFound { id: session_id.to_string() });
        }
        Ok(())
    }

    pub fn set_session_state(&self, session_id: &str, state: SessionState) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE logical_session SET state = ?1 WHERE session_id = ?2",
            params![state.to_string(), session_id],
        )?;
        Ok(())
    }

    /// Mark every `active` session untouched since `idle_after` as `idle`.
    /// Run every 5 minutes by the gateway's sweep task (spec §4.8).
    pub fn sweep_idle_sessions(&self, now: DateTime<Utc>, idle_after: Duration) -> Result<Vec<String>> {
        let db = self.db.lock().unwrap();
        let cutoff = now - idle_after;
        let mut stmt = db.prepare(
            "SELECT session_id FROM logical_session WHERE state = 'active' AND last_activity < ?1",
        )?;
        let ids: Vec<String> = stmt
            .query_map(params![cutoff.to_rfc3339()], |r| r.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        db.execute(
            "UPDATE logical_session SET state = 'idle' WHERE state = 'active' AND last_activity < ?1",
            params![cutoff.to_rfc3339()],
        )?;
        Ok(ids)
    }
}

fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<SessionRow> {
    let state: String = row.get("state")?;
    Ok(SessionRow {
        session_id: row.get("session_id")?,
        user_name: row.get("user_name")?,
        started_at: parse_rfc3339(&row.get::<_, String>("started_at")?),
        last_activity: parse_rfc3339(&row.get::<_, String>("last_activity")?),
        message_count: row.get::<_, i64>("message_count")? as u32,
        state: state.parse().unwrap_or(SessionState::Active),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::new(rusqlite::Connection::open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn create_then_find_active() {
        let s = store();
        s.create_session("sess-1", "alice").unwrap();
        let found = s.find_active_session("alice").unwrap().unwrap();
        assert_eq!(found.session_id, "sess-1");
        assert_eq!(found.message_count, 0);
    }

    #[test]
    fn touch_increments_and_reactivates() {
        let s = store();
        s.create_session("sess-1", "alice").unwrap();
        s.set_session_state("sess-1", SessionState::Idle).unwrap();
        s.touch_session("sess-1").unwrap();
        let row = s.get_session("sess-1").unwrap().unwrap();
        assert_eq!(row.message_count, 1);
        assert_eq!(row.state, SessionState::Active);
    }

    #[test]
    fn sweep_idle_moves_stale_active_sessions() {
        let s = store();
        s.create_session("sess-1", "alice").unwrap();
        let far_future = Utc::now() + Duration::minutes(30);
        let swept = s.sweep_idle_sessions(far_future, Duration::minutes(10)).unwrap();
        assert_eq!(swept, vec!["sess-1".to_string()]);
        assert_eq!(s.get_session("sess-1").unwrap().unwrap().state, SessionState::Idle);
    }

    #[test]
    fn reactivatable_session_respects_window() {
        let s = store();
        s.create_session("sess-1", "alice").unwrap();
        s.set_session_state("sess-1", SessionState::Idle).unwrap();
        let now = Utc::now();
        assert!(s.find_reactivatable_session("alice", now, Duration::hours(1)).unwrap().is_some());
        assert!(s
            .find_reactivatable_session("alice", now + Duration::hours(2), Duration::hours(1))
            .unwrap()
            .is_none());
    }
}
