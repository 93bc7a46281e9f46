//! Schedule extractor (spec §4.5): turns a user turn into an
//! ADD/UPDATE/DELETE/NOTHING intent, with event ids resolved locally rather
//! than trusted from the LLM.

use std::time::Duration;

use chrono::NaiveDate;
use mai_llm::{GenerateOptions, LlmClient};
use mai_memory::ScheduleEvent;
use tracing::warn;

use crate::heuristics::{action_keywords_present, is_schedule_query};
use crate::json::parse_json_object;
use crate::types::{coerce_importance, coerce_time, RawSchedule, ScheduleAction, ScheduleExtraction};
use crate::Result;

const TEMPERATURE: f32 = 0.1;

pub struct ScheduleExtractor<'a> {
    llm: &'a LlmClient,
    model: String,
}

impl<'a> ScheduleExtractor<'a> {
    pub fn new(llm: &'a LlmClient, model: impl Into<String>) -> Self {
        Self { llm, model: model.into() }
    }

    /// Extract a schedule intent from `turn_text`. `active_events` is the
    /// user's current active schedule, used only to resolve UPDATE/DELETE
    /// targets by title substring match (spec §4.5) — never to let the LLM
    /// supply a numeric id directly.
    pub async fn extract(
        &self,
        turn_text: &str,
        reference_date: NaiveDate,
        active_events: &[ScheduleEvent],
    ) -> Result<ScheduleExtraction> {
        // Pre-flight: a pure query with no action keywords never reaches the LLM.
        if is_schedule_query(turn_text) && !has_any_action_keyword(turn_text) {
            return Ok(ScheduleExtraction::nothing());
        }

        let prompt = build_prompt(turn_text);
        let opts = GenerateOptions {
            model: self.model.clone(),
            temperature: TEMPERATURE,
            timeout: Duration::from_secs(300),
            ..Default::default()
        };
        let response = self.llm.generate(&prompt, &opts).await?;

        let Some(value) = parse_json_object(&response) else {
            warn!("schedule extraction: could not recover JSON from LLM response");
            return Ok(ScheduleExtraction::nothing());
        };
        let raw: RawSchedule = match serde_json::from_value(value) {
            Ok(r) => r,
            Err(_) => return Ok(ScheduleExtraction::nothing()),
        };

        let action = raw.action();

        // Post-flight: the claimed action must be consistent with keywords
        // actually present in the turn (spec §4.5), or it's rejected back to NOTHING.
        if !action_keywords_present(turn_text, action) {
            return Ok(ScheduleExtraction::nothing());
        }

        match action {
            ScheduleAction::Nothing => Ok(ScheduleExtraction::nothing()),
            ScheduleAction::Add => {
                let Some(title) = raw.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
                    return Ok(ScheduleExtraction::nothing());
                };
                let Some(expr) = raw.date_expression() else {
                    return Ok(ScheduleExtraction::nothing());
                };
                // Schedule extractions whose date expression fails C4 are discarded.
                let Some(event_date) = mai_datetime::parse(expr, reference_date) else {
                    return Ok(ScheduleExtraction::nothing());
                };
                Ok(ScheduleExtraction {
                    action,
                    title: Some(title.to_string()),
                    event_date: Some(event_date),
                    event_time: coerce_time(raw.time.as_deref()),
                    description: raw.description.clone(),
                    importance: coerce_importance(raw.importance.as_ref()),
                    event_id: None,
                })
            }
            ScheduleAction::Update | ScheduleAction::Delete => {
                let Some(title) = raw.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
                    return Ok(ScheduleExtraction::nothing());
                };
                let Some(event_id) = resolve_event_id(title, active_events) else {
                    return Ok(ScheduleExtraction::nothing());
                };
                let event_date = raw
                    .date_expression()
                    .and_then(|expr| mai_datetime::parse(expr, reference_date));
                Ok(ScheduleExtraction {
                    action,
                    title: Some(title.to_string()),
                    event_date,
                    event_time: coerce_time(raw.time.as_deref()),
                    description: raw.description.clone(),
                    importance: coerce_importance(raw.importance.as_ref()),
                    event_id: Some(event_id),
                })
            }
        }
    }
}

/// Resolve an UPDATE/DELETE target by case-insensitive substring match
/// against the user's active events (spec §4.5: "never trust an
/// LLM-supplied numeric id"). Ambiguous (multiple) matches are rejected
/// rather than guessed at.
fn resolve_event_id(title: &str, active_events: &[ScheduleEvent]) -> Option<i64> {
    let needle = title.to_lowercase();
    let mut matches = active_events.iter().filter(|e| {
        let hay = e.title.to_lowercase();
        hay.contains(&needle) || needle.contains(&hay)
    });
    let first = matches.next()?;
    if matches.next().is_some() {
        return None;
    }
    Some(first.id)
}

fn has_any_action_keyword(turn: &str) -> bool {
    action_keywords_present(turn, ScheduleAction::Add)
        || action_keywords_present(turn, ScheduleAction::Update)
        || action_keywords_present(turn, ScheduleAction::Delete)
}

fn build_prompt(turn_text: &str) -> String {
    format!(
        "Decide whether this message is adding, updating, deleting, or not \
         referring to a calendar event. Respond with ONLY a JSON object, nothing else.\n\n\
         User message: {turn_text}\n\n\
         Format: {{\"action\": \"ADD\"|\"UPDATE\"|\"DELETE\"|\"NOTHING\", \"title\": \"...\", \
         \"date_expression\": \"next Friday\", \"time\": \"HH:MM\", \"description\": \"...\", \
         \"importance\": 1-10}}\n\nJSON:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 15).unwrap()
    }

    fn sample_event(id: i64, title: &str) -> ScheduleEvent {
        ScheduleEvent {
            id,
            user_name: "alice".into(),
            title: title.into(),
            event_date: today(),
            event_time: Some(NaiveTime::from_hms_opt(14, 0, 0).unwrap()),
            description: None,
            importance: 5,
            active: true,
            reminder_enabled: false,
            reminder_lead_minutes: 30,
            recipient_email: None,
            reminder_sent: false,
            reminder_sent_at: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn pure_query_never_calls_the_llm() {
        let server = MockServer::start().await;
        let llm = LlmClient::new(server.uri());
        let extractor = ScheduleExtractor::new(&llm, "llama3.1");
        let result = extractor.extract("What's on my schedule tomorrow?", today(), &[]).await.unwrap();
        assert_eq!(result.action, ScheduleAction::Nothing);
    }

    #[tokio::test]
    async fn add_resolves_date_expression() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": r#"{"action": "ADD", "title": "haircut", "date_expression": "next Friday", "time": "09:30", "importance": 5}"#
            })))
            .mount(&server)
            .await;

        let llm = LlmClient::new(server.uri());
        let extractor = ScheduleExtractor::new(&llm, "llama3.1");
        let result = extractor
            .extract("Schedule me for next Friday at 9:30am for my haircut.", today(), &[])
            .await
            .unwrap();
        assert_eq!(result.action, ScheduleAction::Add);
        assert_eq!(result.title.as_deref(), Some("haircut"));
        assert_eq!(result.event_date, Some(NaiveDate::from_ymd_opt(2025, 10, 24).unwrap()));
    }

    #[tokio::test]
    async fn add_without_action_keywords_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": r#"{"action": "ADD", "title": "haircut", "date_expression": "tomorrow"}"#
            })))
            .mount(&server)
            .await;

        let llm = LlmClient::new(server.uri());
        let extractor = ScheduleExtractor::new(&llm, "llama3.1");
        // No ADD keyword present — the LLM's claimed action is inconsistent with the turn.
        let result = extractor.extract("my hair looks nice today", today(), &[]).await.unwrap();
        assert_eq!(result.action, ScheduleAction::Nothing);
    }

    #[tokio::test]
    async fn delete_resolves_event_id_by_title_substring() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": r#"{"action": "DELETE", "title": "dentist"}"#
            })))
            .mount(&server)
            .await;

        let events = vec![sample_event(42, "dentist appointment")];
        let llm = LlmClient::new(server.uri());
        let extractor = ScheduleExtractor::new(&llm, "llama3.1");
        let result = extractor.extract("Cancel my dentist appointment", today(), &events).await.unwrap();
        assert_eq!(result.action, ScheduleAction::Delete);
        assert_eq!(result.event_id, Some(42));
    }

    #[tokio::test]
    async fn delete_with_ambiguous_title_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": r#"{"action": "DELETE", "title": "appointment"}"#
            })))
            .mount(&server)
            .await;

        let events = vec![sample_event(1, "dentist appointment"), sample_event(2, "vet appointment")];
        let llm = LlmClient::new(server.uri());
        let extractor = ScheduleExtractor::new(&llm, "llama3.1");
        let result = extractor.extract("Cancel my appointment", today(), &events).await.unwrap();
        assert_eq!(result.action, ScheduleAction::Nothing);
    }

    #[tokio::test]
    async fn add_with_unparseable_date_is_dropped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": r#"{"action": "ADD", "title": "thing", "date_expression": "blorpday"}"#
            })))
            .mount(&server)
            .await;

        let llm = LlmClient::new(server.uri());
        let extractor = ScheduleExtractor::new(&llm, "llama3.1");
        let result = extractor.extract("schedule a thing on blorpday", today(), &[]).await.unwrap();
        assert_eq!(result.action, ScheduleAction::Nothing);
    }
}
