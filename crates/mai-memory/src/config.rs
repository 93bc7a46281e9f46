use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

use crate::error::Result;
use crate::manager::MemoryStore;
use crate::types::EmailSettings;

impl MemoryStore {
    /// Read-through target for `mai-config`'s cache (spec §4.1). Raw string
    /// value; typed decoding happens in `mai-config`.
    pub fn get_config_value(&self, key: &str) -> Result<Option<String>> {
        let db = self.db.lock().unwrap();
        db.query_row("SELECT value FROM bot_config WHERE key = ?1", params![key], |r| r.get(0))
            .optional()
            .map_err(Into::into)
    }

    pub fn set_config_value(&self, key: &str, value: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO bot_config (key, value) VALUES (?1,?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn all_config_values(&self) -> Result<Vec<(String, String)>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare("SELECT key, value FROM bot_config")?;
        let rows = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// The single `email_settings` row, seeded with spec §4.14 defaults on
    /// first read since the table starts empty.
    pub fn get_email_settings(&self) -> Result<EmailSettings> {
        let db = self.db.lock().unwrap();
        let row = db
            .query_row(
                "SELECT smtp_host, smtp_port, smtp_use_ssl, smtp_use_tls, smtp_username,
                        smtp_password, imap_host, imap_port, imap_mailbox, imap_username,
                        imap_password, summary_time, summary_timezone, summary_recipient,
                        last_summary_sent_date
                 FROM email_settings WHERE id = 1",
                [],
                row_to_settings,
            )
            .optional()?;
        Ok(row.unwrap_or_default())
    }

    pub fn save_email_settings(&self, settings: &EmailSettings) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO email_settings
                (id, smtp_host, smtp_port, smtp_use_ssl, smtp_use_tls, smtp_username,
                 smtp_password, imap_host, imap_port, imap_mailbox, imap_username,
                 imap_password, summary_time, summary_timezone, summary_recipient,
                 last_summary_sent_date)
             VALUES (1,?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15)
             ON CONFLICT(id) DO UPDATE SET
                smtp_host=excluded.smtp_host, smtp_port=excluded.smtp_port,
                smtp_use_ssl=excluded.smtp_use_ssl, smtp_use_tls=excluded.smtp_use_tls,
                smtp_username=excluded.smtp_username, smtp_password=excluded.smtp_password,
                imap_host=excluded.imap_host, imap_port=excluded.imap_port,
                imap_mailbox=excluded.imap_mailbox, imap_username=excluded.imap_username,
                imap_password=excluded.imap_password, summary_time=excluded.summary_time,
                summary_timezone=excluded.summary_timezone,
                summary_recipient=excluded.summary_recipient,
                last_summary_sent_date=excluded.last_summary_sent_date",
            params![
                settings.smtp_host,
                settings.smtp_port,
                settings.smtp_use_ssl as i64,
                settings.smtp_use_tls as i64,
                settings.smtp_username,
                settings.smtp_password,
                settings.imap_host,
                settings.imap_port,
                settings.imap_mailbox,
                settings.imap_username,
                settings.imap_password,
                settings.summary_time,
                settings.summary_timezone,
                settings.summary_recipient,
                settings.last_summary_sent_date.map(|d| d.to_string()),
            ],
        )?;
        Ok(())
    }

    /// Idempotency guard for the daily summary timer (spec §4.14): fires
    /// only once `last_summary_sent_date < today` in the configured timezone.
    pub fn mark_summary_sent(&self, date: NaiveDate) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE email_settings SET last_summary_sent_date = ?1 WHERE id = 1",
            params![date.to_string()],
        )?;
        Ok(())
    }
}

fn row_to_settings(row: &rusqlite::Row) -> rusqlite::Result<EmailSettings> {
    let last_sent: Option<String> = row.get("last_summary_sent_date")?;
    Ok(EmailSettings {
        smtp_host: row.get("smtp_host")?,
        smtp_port: row.get::<_, Option<i64>>("smtp_port")?.map(|p| p as u16),
        smtp_use_ssl: row.get::<_, i64>("smtp_use_ssl")? != 0,
        smtp_use_tls: row.get::<_, i64>("smtp_use_tls")? != 0,
        smtp_username: row.get("smtp_username")?,
        smtp_password: row.get("smtp_password")?,
        imap_host: row.get("imap_host")?,
        imap_port: row.get::<_, Option<i64>>("imap_port")?.map(|p| p as u16),
        imap_mailbox: row.get("imap_mailbox")?,
        imap_username: row.get("imap_username")?,
        imap_password: row.get("imap_password")?,
        summary_time: row.get("summary_time")?,
        summary_timezone: row.get("summary_timezone")?,
        summary_recipient: row.get("summary_recipient")?,
        last_summary_sent_date: last_sent.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::new(rusqlite::Connection::open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn config_kv_roundtrip() {
        let s = store();
        assert_eq!(s.get_config_value("persona").unwrap(), None);
        s.set_config_value("persona", "friendly assistant").unwrap();
        assert_eq!(s.get_config_value("persona").unwrap().as_deref(), Some("friendly assistant"));
        s.set_config_value("persona", "terse assistant").unwrap();
        assert_eq!(s.get_config_value("persona").unwrap().as_deref(), Some("terse assistant"));
    }

    #[test]
    fn email_settings_default_before_first_save() {
        let s = store();
        let settings = s.get_email_settings().unwrap();
        assert_eq!(settings.imap_mailbox, "");
        assert_eq!(settings.last_summary_sent_date, None);
    }

    #[test]
    fn email_settings_roundtrip() {
        let s = store();
        let mut settings = EmailSettings { imap_mailbox: "INBOX".into(), summary_time: "08:00".into(), ..Default::default() };
        settings.smtp_host = Some("smtp.example.com".into());
        s.save_email_settings(&settings).unwrap();
        let read_back = s.get_email_settings().unwrap();
        assert_eq!(read_back.smtp_host.as_deref(), Some("smtp.example.com"));
        assert_eq!(read_back.imap_mailbox, "INBOX");
    }
}
