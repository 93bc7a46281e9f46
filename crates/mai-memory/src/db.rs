use rusqlite::{Connection, Result};

/// Initialise every table owned by the memory store (spec §3). Safe to call
/// on every startup — every statement is `IF NOT EXISTS`.
///
/// Per spec §3 "Ownership", the memory store is the *only* component that
/// talks to the database: the KV bot-config table, session rows, schedule
/// rows, and every e-mail-channel row all live here too, even though their
/// *behavior* is implemented by other crates (`mai-config`, `mai-sessions`,
/// `mai-scheduler`, `mai-email`).
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA foreign_keys=ON;",
    )?;
    create_turns_table(conn)?;
    create_sessions_table(conn)?;
    create_persistent_memory_table(conn)?;
    create_schedule_events_table(conn)?;
    create_email_tables(conn)?;
    create_config_tables(conn)?;
    create_consolidation_log_table(conn)?;
    Ok(())
}

fn create_turns_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS conversation_turn (
            id                      INTEGER PRIMARY KEY AUTOINCREMENT,
            user_name               TEXT NOT NULL,
            channel_session         TEXT NOT NULL,
            logical_session_id      TEXT NOT NULL,
            modality                TEXT NOT NULL,
            role                    TEXT NOT NULL,
            message                 TEXT NOT NULL,
            embedding               TEXT,
            timestamp               TEXT NOT NULL,
            topic_state             TEXT,
            topic_summary           TEXT,
            consolidated_at         TEXT,
            consolidated_summary_id INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_turn_session
            ON conversation_turn(logical_session_id, timestamp);
        CREATE INDEX IF NOT EXISTS idx_turn_user
            ON conversation_turn(user_name, timestamp);",
    )
}

fn create_sessions_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS logical_session (
            session_id     TEXT PRIMARY KEY,
            user_name      TEXT NOT NULL,
            started_at     TEXT NOT NULL,
            last_activity  TEXT NOT NULL,
            message_count  INTEGER NOT NULL DEFAULT 0,
            state          TEXT NOT NULL DEFAULT 'active'
        );
        CREATE INDEX IF NOT EXISTS idx_session_user_state
            ON logical_session(user_name, state, last_activity DESC);",
    )
}

fn create_persistent_memory_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS persistent_memory (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            user_name         TEXT NOT NULL,
            category          TEXT NOT NULL,
            content           TEXT NOT NULL,
            importance        INTEGER NOT NULL,
            tags              TEXT NOT NULL DEFAULT '[]',
            event_date        TEXT,
            event_time        TEXT,
            extracted_at      TEXT NOT NULL,
            source_session_id TEXT,
            active            INTEGER NOT NULL DEFAULT 1
        );
        CREATE INDEX IF NOT EXISTS idx_memory_user_active
            ON persistent_memory(user_name, active, importance DESC);
        CREATE INDEX IF NOT EXISTS idx_memory_schedule_window
            ON persistent_memory(user_name, category, event_date);",
    )
}

fn create_schedule_events_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schedule_event (
            id                     INTEGER PRIMARY KEY AUTOINCREMENT,
            user_name              TEXT NOT NULL,
            title                  TEXT NOT NULL,
            event_date             TEXT NOT NULL,
            event_time             TEXT,
            description            TEXT,
            importance             INTEGER NOT NULL DEFAULT 5,
            active                 INTEGER NOT NULL DEFAULT 1,
            reminder_enabled       INTEGER NOT NULL DEFAULT 0,
            reminder_lead_minutes  INTEGER NOT NULL DEFAULT 30,
            recipient_email        TEXT,
            reminder_sent          INTEGER NOT NULL DEFAULT 0,
            reminder_sent_at       TEXT,
            created_at             TEXT NOT NULL,
            updated_at             TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_event_user_active
            ON schedule_event(user_name, active, event_date);
        CREATE INDEX IF NOT EXISTS idx_event_reminder_due
            ON schedule_event(reminder_enabled, reminder_sent, event_date);
        CREATE VIRTUAL TABLE IF NOT EXISTS schedule_event_fts
            USING fts5(title, content='schedule_event', content_rowid='id');",
    )
}

fn create_email_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS email_thread (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            subject             TEXT NOT NULL,
            normalized_subject  TEXT NOT NULL,
            user_email          TEXT NOT NULL,
            mapped_user         TEXT,
            first_message_id    TEXT,
            last_message_id     TEXT,
            message_count       INTEGER NOT NULL DEFAULT 0,
            created_at          TEXT NOT NULL,
            updated_at          TEXT NOT NULL,
            UNIQUE(normalized_subject, user_email)
        );

        CREATE TABLE IF NOT EXISTS thread_message (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            thread_id      INTEGER NOT NULL REFERENCES email_thread(id),
            email_log_id   INTEGER,
            role           TEXT NOT NULL,
            message_content TEXT NOT NULL,
            timestamp      TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_thread_message_thread
            ON thread_message(thread_id, timestamp);

        CREATE TABLE IF NOT EXISTS email_action (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            thread_id       INTEGER NOT NULL,
            email_log_id    INTEGER NOT NULL,
            action_type     TEXT NOT NULL,
            action          TEXT NOT NULL,
            intent          TEXT NOT NULL,
            status          TEXT NOT NULL,
            details         TEXT NOT NULL DEFAULT '{}',
            error_message   TEXT,
            executed_at     TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_email_action_log
            ON email_action(email_log_id);

        CREATE TABLE IF NOT EXISTS email_log (
            id                      INTEGER PRIMARY KEY AUTOINCREMENT,
            direction               TEXT NOT NULL,
            email_type              TEXT NOT NULL,
            from_addr               TEXT NOT NULL,
            to_addr                 TEXT NOT NULL,
            subject                 TEXT NOT NULL,
            body_preview            TEXT NOT NULL,
            full_body               TEXT NOT NULL,
            status                  TEXT NOT NULL,
            error_message           TEXT,
            mapped_user             TEXT,
            thread_id               INTEGER,
            attachments_count       INTEGER NOT NULL DEFAULT 0,
            attachments_metadata    TEXT NOT NULL DEFAULT '[]',
            timestamp               TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_email_log_thread
            ON email_log(thread_id, timestamp);

        CREATE TABLE IF NOT EXISTS email_mapping (
            email_address TEXT PRIMARY KEY,
            user_name     TEXT NOT NULL
        );",
    )
}

fn create_config_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS bot_config (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS email_settings (
            id              INTEGER PRIMARY KEY CHECK (id = 1),
            smtp_host       TEXT,
            smtp_port       INTEGER,
            smtp_use_ssl    INTEGER NOT NULL DEFAULT 0,
            smtp_use_tls    INTEGER NOT NULL DEFAULT 1,
            smtp_username   TEXT,
            smtp_password   TEXT,
            imap_host       TEXT,
            imap_port       INTEGER,
            imap_mailbox    TEXT NOT NULL DEFAULT 'INBOX',
            imap_username   TEXT,
            imap_password   TEXT,
            summary_time    TEXT NOT NULL DEFAULT '08:00',
            summary_timezone TEXT NOT NULL DEFAULT 'America/New_York',
            summary_recipient TEXT,
            last_summary_sent_date TEXT
        );",
    )
}

fn create_consolidation_log_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS memory_consolidation_log (
            id                     INTEGER PRIMARY KEY AUTOINCREMENT,
            user_name              TEXT NOT NULL,
            cutoff_date            TEXT NOT NULL,
            messages_consolidated  INTEGER NOT NULL,
            summaries_created      INTEGER NOT NULL,
            tokens_saved_estimate  INTEGER NOT NULL,
            created_at             TEXT NOT NULL
        );",
    )
}
