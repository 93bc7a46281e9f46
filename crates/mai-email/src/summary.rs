//! Daily digest (spec §4.14 / C14): a minute-granularity sweep that fires
//! once per day at `summary_time` local, aggregates the last 24h across
//! every user plus the week ahead, asks the LLM to narrate it, and e-mails
//! the result. Modeled on `mai_scheduler::reminder`'s pure-function-plus-
//! injected-send pattern so the aggregation and fire-time logic are
//! testable without a live SMTP server.

use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};
use mai_config::ConfigStore;
use mai_llm::{GenerateOptions, LlmClient};
use mai_memory::{EmailSettings, MemoryStore};
use tracing::{info, warn};

use crate::error::EmailError;
use crate::reply::ReplyEnvelope;
use crate::transport::MailTransport;

/// Whether the digest should fire right now: `now` (already converted to
/// the configured timezone) matches `summary_time` to the minute and it
/// hasn't already gone out today.
pub fn is_due(settings: &EmailSettings, now_local: DateTime<chrono_tz::Tz>) -> bool {
    let Ok(fire_time) = NaiveTime::parse_from_str(&settings.summary_time, "%H:%M") else {
        return false;
    };
    let today = now_local.date_naive();
    if settings.last_summary_sent_date == Some(today) {
        return false;
    }
    now_local.time().hour() == fire_time.hour() && now_local.time().minute() == fire_time.minute()
}

/// Raw material for the digest, gathered before the LLM is asked to
/// narrate it (spec §4.14 "aggregates").
pub struct DigestInputs {
    pub turns_last_24h: usize,
    pub schedule_changes: Vec<String>,
    pub upcoming_events: Vec<String>,
    pub new_memories: Vec<String>,
}

pub fn gather_inputs(store: &MemoryStore, now: DateTime<Utc>) -> Result<DigestInputs, EmailError> {
    let cutoff = now - Duration::hours(24);
    let turns = store.turns_since(cutoff)?;
    let changed = store.events_updated_since(cutoff)?;
    let upcoming = store.events_between_all_users(now.date_naive(), (now + Duration::days(7)).date_naive())?;
    let memories = store.memories_since(cutoff)?;

    Ok(DigestInputs {
        turns_last_24h: turns.len(),
        schedule_changes: changed
            .iter()
            .map(|e| format!("{} — {} ({})", e.user_name, e.title, e.event_date))
            .collect(),
        upcoming_events: upcoming
            .iter()
            .map(|e| format!("{} — {} on {}", e.user_name, e.title, e.event_date))
            .collect(),
        new_memories: memories.iter().map(|m| format!("{} — {}", m.user_name, m.content)).collect(),
    })
}

fn build_prompt(inputs: &DigestInputs) -> String {
    let mut prompt = String::from(
        "Write a short daily digest e-mail summarizing the last 24 hours of activity \
         and the week ahead. Be concise and skip any section that's empty.\n\n",
    );
    prompt.push_str(&format!("Conversation turns in the last 24h: {}\n", inputs.turns_last_24h));
    prompt.push_str("Schedule changes:\n");
    for line in &inputs.schedule_changes {
        prompt.push_str(&format!("- {line}\n"));
    }
    prompt.push_str("Upcoming events (next 7 days):\n");
    for line in &inputs.upcoming_events {
        prompt.push_str(&format!("- {line}\n"));
    }
    prompt.push_str("New memories learned in the last 24h:\n");
    for line in &inputs.new_memories {
        prompt.push_str(&format!("- {line}\n"));
    }
    prompt
}

/// One sweep of the digest timer. Returns `true` if a digest was sent.
/// On LLM failure the digest is logged and **not** sent (spec §4.14).
pub async fn run_once(
    transport: &mut dyn MailTransport,
    store: &MemoryStore,
    config: &ConfigStore,
    llm: &LlmClient,
    bot_email: &str,
    now: DateTime<Utc>,
) -> Result<bool, EmailError> {
    let settings = store.get_email_settings()?;
    let tz: chrono_tz::Tz = settings.summary_timezone.parse().unwrap_or(chrono_tz::UTC);
    let now_local = now.with_timezone(&tz);

    if !is_due(&settings, now_local) {
        return Ok(false);
    }

    let Some(recipient) = settings.summary_recipient.clone() else {
        warn!("daily digest is due but no summary_recipient is configured, skipping");
        return Ok(false);
    };

    let inputs = gather_inputs(store, now)?;
    let prompt = build_prompt(&inputs);
    let opts = GenerateOptions { model: config.ollama_model(), ..Default::default() };

    let narrated = match llm.generate(&prompt, &opts).await {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "daily digest generation failed, not sending");
            return Ok(false);
        }
    };

    let envelope = ReplyEnvelope {
        to: recipient,
        subject: format!("Daily summary — {}", now_local.date_naive()),
        in_reply_to: None,
        references: Vec::new(),
        html_body: format!("<p>{}</p>", narrated.replace('\n', "<br>")),
        plain_body: narrated,
    };

    transport.send(bot_email, &envelope).await?;
    store.mark_summary_sent(now_local.date_naive())?;
    info!(date = %now_local.date_naive(), "daily digest sent");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn due_at_exact_configured_minute() {
        let settings = EmailSettings { summary_time: "08:00".into(), ..Default::default() };
        let tz = chrono_tz::America::New_York;
        let now = tz.with_ymd_and_hms(2026, 7, 29, 8, 0, 0).unwrap();
        assert!(is_due(&settings, now));
    }

    #[test]
    fn not_due_outside_the_configured_minute() {
        let settings = EmailSettings { summary_time: "08:00".into(), ..Default::default() };
        let tz = chrono_tz::America::New_York;
        let now = tz.with_ymd_and_hms(2026, 7, 29, 8, 5, 0).unwrap();
        assert!(!is_due(&settings, now));
    }

    #[test]
    fn not_due_if_already_sent_today() {
        let settings = EmailSettings {
            summary_time: "08:00".into(),
            last_summary_sent_date: Some(chrono::NaiveDate::from_ymd_opt(2026, 7, 29).unwrap()),
            ..Default::default()
        };
        let tz = chrono_tz::America::New_York;
        let now = tz.with_ymd_and_hms(2026, 7, 29, 8, 0, 0).unwrap();
        assert!(!is_due(&settings, now));
    }
}
