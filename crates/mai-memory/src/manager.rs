use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use mai_core::{MemoryCategory, Modality, Role, TopicState};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::dedup::{jaccard_word_overlap, MEMORY_DEDUP_JACCARD_THRESHOLD};
use crate::error::{MemoryError, Result};
use crate::types::*;

/// Window either side of a schedule memory's `event_date` searched for a
/// fuzzy duplicate when no exact `(date, time)` match exists (spec §4.3).
const SCHEDULE_DEDUP_WINDOW_DAYS: i64 = 3;

/// Owns the single SQLite connection backing the whole system (spec §3
/// Ownership: "no other component mutates the database directly"). Other
/// crates hold an `Arc<MemoryStore>` and call its typed methods.
pub struct MemoryStore {
    pub(crate) db: Mutex<Connection>,
}

impl MemoryStore {
    pub fn new(conn: Connection) -> Result<Self> {
        crate::db::init_db(&conn)?;
        Ok(Self { db: Mutex::new(conn) })
    }

    /// Cheap liveness probe for the DB circuit breaker (spec §7 "Circuit
    /// breakers. One per external service (LLM, TTS, STT, DB)").
    pub fn health_check(&self) -> Result<()> {
        self.db.lock().unwrap().execute_batch("SELECT 1")?;
        Ok(())
    }

    // ── turns ──────────────────────────────────────────────────────────────

    /// Persist one turn. Per spec §4.7, user turns are saved synchronously
    /// before context assembly; assistant turns are saved fire-and-forget
    /// but must still go through this same call.
    #[allow(clippy::too_many_arguments)]
    pub fn save_turn(
        &self,
        user_name: &str,
        channel_session: &str,
        logical_session_id: &str,
        modality: Modality,
        role: Role,
        message: &str,
        embedding: Option<&[f32]>,
    ) -> Result<i64> {
        let db = self.db.lock().unwrap();
        let now = Utc::now();
        let embedding_json = match embedding {
            Some(e) => Some(serde_json::to_string(e)?),
            None => None,
        };

        db.execute(
            "INSERT INTO conversation_turn
                (user_name, channel_session, logical_session_id, modality, role,
                 message, embedding, timestamp, topic_state)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,'active')",
            params![
                user_name,
                channel_session,
                logical_session_id,
                modality.to_string(),
                role.to_string(),
                message,
                embedding_json,
                now.to_rfc3339(),
            ],
        )?;
        let id = db.last_insert_rowid();

        if role == Role::User {
            resolve_stale_topic(&db, logical_session_id, message)?;
        }

        debug!(id, user_name, %modality, %role, "turn saved");
        Ok(id)
    }

    /// Backfill an embedding computed after the fact (spec §4.3: "Embedding
    /// is computed asynchronously if omitted").
    pub fn update_turn_embedding(&self, turn_id: i64, embedding: &[f32]) -> Result<()> {
        let db = self.db.lock().unwrap();
        let json = serde_json::to_string(embedding)?;
        db.execute(
            "UPDATE conversation_turn SET embedding = ?1 WHERE id = ?2",
            params![json, turn_id],
        )?;
        Ok(())
    }

    /// Chronological turns for one session, most recent `limit`.
    pub fn recent_turns(&self, session_id: &str, limit: u32) -> Result<Vec<Turn>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT * FROM (
                SELECT id, user_name, channel_session, logical_session_id, modality, role,
                       message, embedding, timestamp, topic_state, topic_summary,
                       consolidated_at, consolidated_summary_id
                FROM conversation_turn
                WHERE logical_session_id = ?1
                ORDER BY timestamp DESC, id DESC
                LIMIT ?2
            ) ORDER BY timestamp ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![session_id, limit], row_to_turn)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Cosine-similarity ranked recall over a user's history, excluding the
    /// current session and any turn whose topic has been resolved (spec §4.3).
    pub fn semantic_recall(
        &self,
        user_name: &str,
        query_embedding: &[f32],
        exclude_session_id: &str,
        limit: u32,
        min_similarity: f32,
    ) -> Result<Vec<Turn>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, user_name, channel_session, logical_session_id, modality, role,
                    message, embedding, timestamp, topic_state, topic_summary,
                    consolidated_at, consolidated_summary_id
             FROM conversation_turn
             WHERE user_name = ?1
               AND logical_session_id != ?2
               AND embedding IS NOT NULL
               AND (topic_state IS NULL OR topic_state != 'resolved')",
        )?;
        let candidates = stmt
            .query_map(params![user_name, exclude_session_id], row_to_turn)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut scored: Vec<(f32, Turn)> = candidates
            .into_iter()
            .filter_map(|t| {
                let emb = t.embedding.as_deref()?;
                let sim = cosine_similarity(query_embedding, emb);
                (sim >= min_similarity).then_some((sim, t))
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit as usize);
        Ok(scored.into_iter().map(|(_, t)| t).collect())
    }

    /// Every turn across every user since `cutoff`, for the daily summary's
    /// "last 24h of turns" aggregate (spec §4.14).
    pub fn turns_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Turn>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, user_name, channel_session, logical_session_id, modality, role,
                    message, embedding, timestamp, topic_state, topic_summary,
                    consolidated_at, consolidated_summary_id
             FROM conversation_turn
             WHERE timestamp >= ?1
             ORDER BY timestamp ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![cutoff.to_rfc3339()], row_to_turn)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── persistent memory ────────────────────────────────────────────────────

    /// Save (with dedup) a persistent memory. Returns the id of the row that
    /// now represents this fact — either freshly inserted or the existing
    /// duplicate (spec §4.3 dedup rules, §7 error kind 4, §8 dedup invariant).
    #[allow(clippy::too_many_arguments)]
    pub fn save_persistent_memory(
        &self,
        user_name: &str,
        category: MemoryCategory,
        content: &str,
        importance: u8,
        event_date: Option<NaiveDate>,
        event_time: Option<NaiveTime>,
        tags: &[String],
        source_session: Option<&str>,
    ) -> Result<i64> {
        if category == MemoryCategory::Schedule && event_date.is_none() {
            return Err(MemoryError::InvalidArgument(
                "schedule-category memories require event_date".into(),
            ));
        }
        let importance = importance.clamp(1, 10);
        let db = self.db.lock().unwrap();

        if let Some(existing_id) =
            find_memory_duplicate(&db, user_name, category, content, event_date, event_time)?
        {
            raise_importance_if_higher(&db, "persistent_memory", existing_id, importance)?;
            return Ok(existing_id);
        }

        let now = Utc::now();
        let tags_json = serde_json::to_string(tags)?;
        db.execute(
            "INSERT INTO persistent_memory
                (user_name, category, content, importance, tags, event_date, event_time,
                 extracted_at, source_session_id, active)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,1)",
            params![
                user_name,
                category.to_string(),
                content,
                importance,
                tags_json,
                event_date.map(|d| d.to_string()),
                event_time.map(|t| t.to_string()),
                now.to_rfc3339(),
                source_session,
            ],
        )?;
        let id = db.last_insert_rowid();
        info!(id, user_name, %category, "persistent memory saved");
        Ok(id)
    }

    /// Active, non-schedule memories ordered by importance desc (spec §4.6
    /// step 5). `category_filter` narrows to one category when set.
    pub fn list_memories(
        &self,
        user_name: &str,
        exclude_schedule: bool,
        limit: u32,
    ) -> Result<Vec<PersistentMemory>> {
        let db = self.db.lock().unwrap();
        let sql = if exclude_schedule {
            "SELECT id, user_name, category, content, importance, tags, event_date, event_time,
                    extracted_at, source_session_id, active
             FROM persistent_memory
             WHERE user_name = ?1 AND active = 1 AND category != 'schedule'
             ORDER BY importance DESC, extracted_at DESC
             LIMIT ?2"
        } else {
            "SELECT id, user_name, category, content, importance, tags, event_date, event_time,
                    extracted_at, source_session_id, active
             FROM persistent_memory
             WHERE user_name = ?1 AND active = 1
             ORDER BY importance DESC, extracted_at DESC
             LIMIT ?2"
        };
        let mut stmt = db.prepare(sql)?;
        let rows = stmt
            .query_map(params![user_name, limit], row_to_memory)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Every active memory across every user extracted since `cutoff`, for
    /// the daily summary's "last 24h of new memories" aggregate (spec
    /// §4.14).
    pub fn memories_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<PersistentMemory>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, user_name, category, content, importance, tags, event_date, event_time,
                    extracted_at, source_session_id, active
             FROM persistent_memory
             WHERE active = 1 AND extracted_at >= ?1
             ORDER BY extracted_at ASC",
        )?;
        let rows = stmt
            .query_map(params![cutoff.to_rfc3339()], row_to_memory)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── consolidation primitives (orchestrated by mai-extraction) ───────────

    /// Users with `>= 5` turns older than `cutoff` not yet consolidated
    /// (spec §4.3 Consolidation), grouped into chunks of up to 15.
    pub fn consolidation_candidates(
        &self,
        user_name: Option<&str>,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<(String, Vec<Vec<Turn>>)>> {
        let db = self.db.lock().unwrap();
        let users: Vec<String> = match user_name {
            Some(u) => vec![u.to_string()],
            None => {
                let mut stmt = db.prepare(
                    "SELECT DISTINCT user_name FROM conversation_turn
                     WHERE timestamp < ?1 AND consolidated_at IS NULL",
                )?;
                stmt.query_map(params![cutoff.to_rfc3339()], |r| r.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
        };

        let mut out = Vec::new();
        for user in users {
            let mut stmt = db.prepare(
                "SELECT id, user_name, channel_session, logical_session_id, modality, role,
                        message, embedding, timestamp, topic_state, topic_summary,
                        consolidated_at, consolidated_summary_id
                 FROM conversation_turn
                 WHERE user_name = ?1 AND timestamp < ?2 AND consolidated_at IS NULL
                 ORDER BY timestamp ASC",
            )?;
            let turns: Vec<Turn> = stmt
                .query_map(params![user, cutoff.to_rfc3339()], row_to_turn)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            if turns.len() < 5 {
                continue;
            }
            let chunks: Vec<Vec<Turn>> = turns.chunks(15).map(|c| c.to_vec()).collect();
            out.push((user, chunks));
        }
        Ok(out)
    }

    /// Persist one chunk's summary: insert the `consolidated_history` memory,
    /// soft-delete the original turns, and log the consolidation.
    pub fn commit_consolidation_chunk(
        &self,
        user_name: &str,
        turn_ids: &[i64],
        summary: &str,
        cutoff: DateTime<Utc>,
        tokens_saved_estimate: i64,
    ) -> Result<i64> {
        let db = self.db.lock().unwrap();
        let now = Utc::now();

        db.execute(
            "INSERT INTO persistent_memory
                (user_name, category, content, importance, tags, event_date, event_time,
                 extracted_at, source_session_id, active)
             VALUES (?1,'consolidated_history',?2,7,'[]',NULL,NULL,?3,NULL,1)",
            params![user_name, summary, now.to_rfc3339()],
        )?;
        let memory_id = db.last_insert_rowid();

        for id in turn_ids {
            db.execute(
                "UPDATE conversation_turn SET consolidated_at = ?1, consolidated_summary_id = ?2
                 WHERE id = ?3",
                params![now.to_rfc3339(), memory_id, id],
            )?;
        }
        db.execute(
            "DELETE FROM conversation_turn WHERE id IN (SELECT value FROM json_each(?1))",
            params![serde_json::to_string(turn_ids)?],
        )?;

        db.execute(
            "INSERT INTO memory_consolidation_log
                (user_name, cutoff_date, messages_consolidated, summaries_created,
                 tokens_saved_estimate, created_at)
             VALUES (?1,?2,?3,1,?4,?5)",
            params![
                user_name,
                cutoff.to_rfc3339(),
                turn_ids.len() as i64,
                tokens_saved_estimate,
                now.to_rfc3339(),
            ],
        )?;

        Ok(memory_id)
    }
}

// ── row mapping ────────────────────────────────────────────────────────────

pub(crate) fn row_to_turn(row: &rusqlite::Row) -> rusqlite::Result<Turn> {
    let embedding_json: Option<String> = row.get("embedding")?;
    let embedding = embedding_json.and_then(|j| serde_json::from_str(&j).ok());
    let topic_state: Option<String> = row.get("topic_state")?;
    let consolidated_at: Option<String> = row.get("consolidated_at")?;

    Ok(Turn {
        id: row.get("id")?,
        user_name: row.get("user_name")?,
        channel_session: row.get("channel_session")?,
        logical_session_id: row.get("logical_session_id")?,
        modality: row.get::<_, String>("modality")?.parse().unwrap_or(Modality::Text),
        role: row.get::<_, String>("role")?.parse().unwrap_or(Role::User),
        message: row.get("message")?,
        embedding,
        timestamp: parse_rfc3339(&row.get::<_, String>("timestamp")?),
        topic_state: topic_state.and_then(|s| TopicState::from_str(&s).ok()),
        topic_summary: row.get("topic_summary")?,
        consolidated_at: consolidated_at.map(|s| parse_rfc3339(&s)),
        consolidated_summary_id: row.get("consolidated_summary_id")?,
    })
}

pub(crate) fn row_to_memory(row: &rusqlite::Row) -> rusqlite::Result<PersistentMemory> {
    let tags_json: String = row.get("tags")?;
    let event_date: Option<String> = row.get("event_date")?;
    let event_time: Option<String> = row.get("event_time")?;

    Ok(PersistentMemory {
        id: row.get("id")?,
        user_name: row.get("user_name")?,
        category: row
            .get::<_, String>("category")?
            .parse()
            .unwrap_or(MemoryCategory::Other),
        content: row.get("content")?,
        importance: row.get::<_, i64>("importance")? as u8,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        event_date: event_date.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        event_time: event_time.and_then(|t| NaiveTime::parse_from_str(&t, "%H:%M:%S").ok()),
        extracted_at: parse_rfc3339(&row.get::<_, String>("extracted_at")?),
        source_session_id: row.get("source_session_id")?,
        active: row.get::<_, i64>("active")? != 0,
    })
}

pub(crate) fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

// ── dedup helpers ────────────────────────────────────────────────────────

fn find_memory_duplicate(
    db: &Connection,
    user_name: &str,
    category: MemoryCategory,
    content: &str,
    event_date: Option<NaiveDate>,
    event_time: Option<NaiveTime>,
) -> Result<Option<i64>> {
    if category == MemoryCategory::Schedule {
        if let Some(date) = event_date {
            // Exact (user, category, event_date, event_time) match.
            let exact: Option<i64> = db
                .query_row(
                    "SELECT id FROM persistent_memory
                     WHERE user_name = ?1 AND category = 'schedule' AND active = 1
                       AND event_date = ?2 AND event_time IS ?3",
                    params![user_name, date.to_string(), event_time.map(|t| t.to_string())],
                    |r| r.get(0),
                )
                .optional()?;
            if let Some(id) = exact {
                return Ok(Some(id));
            }

            // ±3-day window, Jaccard overlap > 0.6.
            let window_start = (date - chrono::Duration::days(SCHEDULE_DEDUP_WINDOW_DAYS)).to_string();
            let window_end = (date + chrono::Duration::days(SCHEDULE_DEDUP_WINDOW_DAYS)).to_string();
            let mut stmt = db.prepare(
                "SELECT id, content FROM persistent_memory
                 WHERE user_name = ?1 AND category = 'schedule' AND active = 1
                   AND event_date BETWEEN ?2 AND ?3",
            )?;
            let candidates: Vec<(i64, String)> = stmt
                .query_map(params![user_name, window_start, window_end], |r| {
                    Ok((r.get(0)?, r.get(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            for (id, existing_content) in candidates {
                if jaccard_word_overlap(content, &existing_content) > MEMORY_DEDUP_JACCARD_THRESHOLD {
                    return Ok(Some(id));
                }
            }
            return Ok(None);
        }
    }

    // Non-schedule: exact (user, category, content) match.
    db.query_row(
        "SELECT id FROM persistent_memory
         WHERE user_name = ?1 AND category = ?2 AND content = ?3 AND active = 1",
        params![user_name, category.to_string(), content],
        |r| r.get(0),
    )
    .optional()
    .map_err(MemoryError::from)
}

fn raise_importance_if_higher(db: &Connection, table: &str, id: i64, new_importance: u8) -> Result<()> {
    let current: i64 = db.query_row(
        &format!("SELECT importance FROM {table} WHERE id = ?1"),
        params![id],
        |r| r.get(0),
    )?;
    if (new_importance as i64) > current {
        db.execute(
            &format!("UPDATE {table} SET importance = ?1 WHERE id = ?2"),
            params![new_importance, id],
        )?;
    }
    Ok(())
}

/// Topic-shift detection (supplemented from `original_source/sip-mumble-bridge/
/// memory_manager.py:638`, SPEC_FULL.md §C): word-overlap < 0.3 between the
/// newest user turn and the session's previous active turns marks those
/// turns `resolved` so `semantic_recall` stops surfacing a closed topic.
fn resolve_stale_topic(db: &Connection, logical_session_id: &str, new_message: &str) -> Result<()> {
    let mut stmt = db.prepare(
        "SELECT id, message FROM conversation_turn
         WHERE logical_session_id = ?1 AND role = 'user' AND topic_state = 'active'
         ORDER BY timestamp DESC LIMIT 5",
    )?;
    let recent: Vec<(i64, String)> = stmt
        .query_map(params![logical_session_id], |r| Ok((r.get(0)?, r.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let recent_words: String = recent.iter().map(|(_, m)| m.as_str()).collect::<Vec<_>>().join(" ");
    if recent_words.is_empty() {
        return Ok(());
    }
    if jaccard_word_overlap(new_message, &recent_words) < 0.3 {
        db.execute(
            "UPDATE conversation_turn SET topic_state = 'resolved'
             WHERE logical_session_id = ?1 AND role = 'user' AND topic_state = 'active'",
            params![logical_session_id],
        )?;
    }
    Ok(())
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn save_and_recall_turn() {
        let s = store();
        s.save_turn("alice", "sess-1", "logsess-1", Modality::Voice, Role::User, "hello", None).unwrap();
        let turns = s.recent_turns("logsess-1", 10).unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].message, "hello");
    }

    #[test]
    fn turn_ordering_user_before_assistant() {
        let s = store();
        s.save_turn("alice", "sess-1", "logsess-1", Modality::Text, Role::User, "hi", None).unwrap();
        s.save_turn("alice", "sess-1", "logsess-1", Modality::Text, Role::Assistant, "hello!", None).unwrap();
        let turns = s.recent_turns("logsess-1", 10).unwrap();
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].role, Role::Assistant);
        assert!(turns[1].timestamp >= turns[0].timestamp);
    }

    #[test]
    fn dedup_schedule_memory_is_idempotent() {
        let s = store();
        let date = NaiveDate::from_ymd_opt(2025, 10, 24).unwrap();
        let id1 = s
            .save_persistent_memory("alice", MemoryCategory::Schedule, "haircut", 5, Some(date), None, &[], None)
            .unwrap();
        let id2 = s
            .save_persistent_memory("alice", MemoryCategory::Schedule, "haircut", 8, Some(date), None, &[], None)
            .unwrap();
        assert_eq!(id1, id2);

        let memories = s.list_memories("alice", false, 10).unwrap();
        assert_eq!(memories.len(), 1);
        assert_eq!(memories[0].importance, 8, "importance should rise, never fall");
    }

    #[test]
    fn schedule_memory_without_date_is_rejected() {
        let s = store();
        let err = s
            .save_persistent_memory("alice", MemoryCategory::Schedule, "haircut", 5, None, None, &[], None)
            .unwrap_err();
        assert!(matches!(err, MemoryError::InvalidArgument(_)));
    }

    #[test]
    fn non_schedule_exact_dedup() {
        let s = store();
        let id1 = s
            .save_persistent_memory("alice", MemoryCategory::Fact, "is vegetarian", 5, None, None, &[], None)
            .unwrap();
        let id2 = s
            .save_persistent_memory("alice", MemoryCategory::Fact, "is vegetarian", 3, None, None, &[], None)
            .unwrap();
        assert_eq!(id1, id2);
    }

    #[test]
    fn semantic_recall_excludes_resolved_topics() {
        let s = store();
        s.save_turn("alice", "sess-1", "logsess-1", Modality::Text, Role::User, "tell me about dogs", Some(&[1.0, 0.0])).unwrap();
        // A strongly divergent follow-up marks the dog turn resolved.
        s.save_turn("alice", "sess-1", "logsess-1", Modality::Text, Role::User, "completely unrelated quantum physics lecture", None).unwrap();

        let results = s.semantic_recall("alice", &[1.0, 0.0], "other-session", 5, 0.0).unwrap();
        assert!(results.iter().all(|t| t.message != "tell me about dogs"));
    }
}
