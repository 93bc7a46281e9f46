//! Memory extractor (spec §4.5): turns a user turn into zero or more
//! `{category, content, importance, date_expression?, event_time?}`
//! candidates, validated and coerced before the caller persists them.

use std::time::Duration;

use chrono::NaiveDate;
use mai_core::MemoryCategory;
use mai_datetime as datetime;
use mai_llm::{GenerateOptions, LlmClient};
use tracing::warn;

use crate::heuristics::{is_schedule_query, is_trivial_acknowledgment};
use crate::json::parse_json_array;
use crate::types::{coerce_importance, coerce_time, ExtractedMemory, RawMemory};
use crate::Result;

const TEMPERATURE: f32 = 0.2;

pub struct MemoryExtractor<'a> {
    llm: &'a LlmClient,
    model: String,
}

impl<'a> MemoryExtractor<'a> {
    pub fn new(llm: &'a LlmClient, model: impl Into<String>) -> Self {
        Self { llm, model: model.into() }
    }

    /// Extract memories from `turn_text`. `assistant_reply` is included for
    /// voice channels to help ground ambiguous references (spec §4.5).
    /// `reference_date` anchors any relative date expression (C4).
    pub async fn extract(
        &self,
        turn_text: &str,
        assistant_reply: Option<&str>,
        reference_date: NaiveDate,
    ) -> Result<Vec<ExtractedMemory>> {
        if is_schedule_query(turn_text) || is_trivial_acknowledgment(turn_text) {
            return Ok(Vec::new());
        }

        let prompt = build_prompt(turn_text, assistant_reply);
        let opts = GenerateOptions {
            model: self.model.clone(),
            temperature: TEMPERATURE,
            timeout: Duration::from_secs(300),
            ..Default::default()
        };
        let response = self.llm.generate(&prompt, &opts).await?;

        let Some(items) = parse_json_array(&response) else {
            warn!("memory extraction: could not recover JSON from LLM response");
            return Ok(Vec::new());
        };

        let mut memories = Vec::new();
        for item in items {
            let raw: RawMemory = match serde_json::from_value(item) {
                Ok(r) => r,
                Err(_) => continue,
            };
            if let Some(memory) = validate(raw, reference_date) {
                memories.push(memory);
            }
        }
        Ok(memories)
    }
}

fn validate(raw: RawMemory, reference_date: NaiveDate) -> Option<ExtractedMemory> {
    let content = raw.content?.trim().to_string();
    if content.is_empty() {
        return None;
    }

    let category = raw
        .category
        .as_deref()
        .and_then(|c| c.parse::<MemoryCategory>().ok())
        .unwrap_or(MemoryCategory::Other);
    let importance = coerce_importance(raw.importance.as_ref());

    let mut event_date = None;
    if category == MemoryCategory::Schedule {
        let expr = raw.date_expression.as_deref()?;
        event_date = datetime::parse(expr, reference_date);
        event_date?; // drop schedule extractions whose date expression fails C4
    }

    let event_time = coerce_time(raw.event_time.as_deref());

    Some(ExtractedMemory { category, content, importance, event_date, event_time })
}

fn build_prompt(turn_text: &str, assistant_reply: Option<&str>) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "Extract important information to remember from this message. \
         Categories: schedule, fact, task, preference, other.\n\n",
    );
    if let Some(reply) = assistant_reply {
        prompt.push_str(&format!("Assistant's prior reply (for context only): {reply}\n"));
    }
    prompt.push_str(&format!("User message: {turn_text}\n\n"));
    prompt.push_str(
        "Rules:\n\
         - Do NOT extract schedule memories when the user is only asking or querying about their schedule.\n\
         - Only extract schedule memories when the user is telling you about a new event.\n\
         - Return an empty array if nothing important is present.\n\
         - Respond with ONLY a JSON array, nothing else.\n\n\
         Format: [{\"category\": \"schedule\", \"content\": \"...\", \"importance\": 1-10, \
         \"date_expression\": \"next Friday\", \"event_time\": \"HH:MM\"}]\n\nJSON:",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 15).unwrap()
    }

    #[tokio::test]
    async fn query_turns_never_call_the_llm() {
        let server = MockServer::start().await;
        // No mock registered for /api/generate — a call would fail the test.
        let llm = LlmClient::new(server.uri());
        let extractor = MemoryExtractor::new(&llm, "llama3.1");
        let result = extractor.extract("What's on my schedule today?", None, today()).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn extracts_and_validates_a_schedule_memory() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": r#"[{"category": "schedule", "content": "Dentist appointment", "importance": 6, "date_expression": "tomorrow", "event_time": "15:00"}]"#
            })))
            .mount(&server)
            .await;

        let llm = LlmClient::new(server.uri());
        let extractor = MemoryExtractor::new(&llm, "llama3.1");
        let memories = extractor.extract("I have a dentist appointment tomorrow at 3pm", None, today()).await.unwrap();
        assert_eq!(memories.len(), 1);
        assert_eq!(memories[0].category, MemoryCategory::Schedule);
        assert_eq!(memories[0].event_date, Some(NaiveDate::from_ymd_opt(2025, 10, 16).unwrap()));
    }

    #[tokio::test]
    async fn unparseable_date_expression_drops_the_schedule_extraction() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": r#"[{"category": "schedule", "content": "Something", "date_expression": "blorpday"}]"#
            })))
            .mount(&server)
            .await;

        let llm = LlmClient::new(server.uri());
        let extractor = MemoryExtractor::new(&llm, "llama3.1");
        let memories = extractor.extract("some new event next blorpday", None, today()).await.unwrap();
        assert!(memories.is_empty());
    }

    #[tokio::test]
    async fn unknown_category_coerces_to_other() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": r#"[{"category": "weird", "content": "something notable", "importance": 99}]"#
            })))
            .mount(&server)
            .await;

        let llm = LlmClient::new(server.uri());
        let extractor = MemoryExtractor::new(&llm, "llama3.1");
        let memories = extractor.extract("notable thing happened", None, today()).await.unwrap();
        assert_eq!(memories.len(), 1);
        assert_eq!(memories[0].category, MemoryCategory::Other);
        assert_eq!(memories[0].importance, 10);
    }

    #[tokio::test]
    async fn empty_content_is_dropped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": r#"[{"category": "fact", "content": "   "}]"#
            })))
            .mount(&server)
            .await;

        let llm = LlmClient::new(server.uri());
        let extractor = MemoryExtractor::new(&llm, "llama3.1");
        let memories = extractor.extract("some fact", None, today()).await.unwrap();
        assert!(memories.is_empty());
    }
}
