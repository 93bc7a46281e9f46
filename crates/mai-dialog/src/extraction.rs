//! Applies C5's extraction results to the store (spec §4.5/§4.7 step 5).
//!
//! Shared by the background jobs spawned for voice/text and the
//! action-synchronous path e-mail uses (spec §4.13): the extractor outputs
//! are identical, only *when* they run and whether the caller waits for
//! them differs.

use chrono::NaiveDate;
use mai_config::ConfigStore;
use mai_extraction::{MemoryExtractor, ScheduleAction, ScheduleExtractor};
use mai_llm::LlmClient;
use mai_memory::{MemoryStore, ScheduleEventUpdate};
use tracing::{info, warn};

/// One applied side effect, logged for voice/text and turned into an
/// `email_action` row by the e-mail channel (spec §4.13's action log).
#[derive(Debug, Clone)]
pub struct AppliedAction {
    pub category: &'static str,
    pub action: &'static str,
    pub intent: String,
    pub success: bool,
    pub event_id: Option<i64>,
    pub error: Option<String>,
}

/// Run both extractors over one turn and persist whatever they find.
/// Never returns an `Err` for a single extraction failure — each action's
/// outcome is captured in its own [`AppliedAction`] instead, so one bad
/// extraction cannot block the others or the caller's reply.
pub async fn apply_extraction(
    store: &MemoryStore,
    llm: &LlmClient,
    config: &ConfigStore,
    user_name: &str,
    turn_text: &str,
    assistant_reply: Option<&str>,
    source_session: &str,
    reference_date: NaiveDate,
) -> Vec<AppliedAction> {
    let mut actions = Vec::new();
    let model = config.memory_extraction_model();

    let memory_extractor = MemoryExtractor::new(llm, model.clone());
    match memory_extractor.extract(turn_text, assistant_reply, reference_date).await {
        Ok(memories) => {
            for memory in memories {
                let result = store.save_persistent_memory(
                    user_name,
                    memory.category,
                    &memory.content,
                    memory.importance,
                    memory.event_date,
                    memory.event_time,
                    &[],
                    Some(source_session),
                );
                actions.push(match result {
                    Ok(id) => {
                        info!(user_name, id, category = %memory.category, "memory extracted and saved");
                        AppliedAction {
                            category: "memory",
                            action: "save",
                            intent: memory.content,
                            success: true,
                            event_id: Some(id),
                            error: None,
                        }
                    }
                    Err(e) => AppliedAction {
                        category: "memory",
                        action: "save",
                        intent: memory.content,
                        success: false,
                        event_id: None,
                        error: Some(e.to_string()),
                    },
                });
            }
        }
        Err(e) => warn!(user_name, error = %e, "memory extraction failed"),
    }

    let active_events = store.all_active_events(user_name).unwrap_or_default();
    let schedule_extractor = ScheduleExtractor::new(llm, model);
    match schedule_extractor.extract(turn_text, reference_date, &active_events).await {
        Ok(extraction) => {
            if let Some(action) = apply_schedule_extraction(store, user_name, &extraction) {
                actions.push(action);
            }
        }
        Err(e) => warn!(user_name, error = %e, "schedule extraction failed"),
    }

    actions
}

fn apply_schedule_extraction(
    store: &MemoryStore,
    user_name: &str,
    extraction: &mai_extraction::ScheduleExtraction,
) -> Option<AppliedAction> {
    match extraction.action {
        ScheduleAction::Nothing => None,
        ScheduleAction::Add => {
            let title = extraction.title.clone()?;
            let event_date = extraction.event_date?;
            let result = store.save_schedule_event(
                user_name,
                &title,
                event_date,
                extraction.event_time,
                extraction.description.as_deref(),
                extraction.importance,
                false,
                30,
                None,
            );
            Some(match result {
                Ok(id) => AppliedAction {
                    category: "schedule",
                    action: "add",
                    intent: title,
                    success: true,
                    event_id: Some(id),
                    error: None,
                },
                Err(e) => AppliedAction {
                    category: "schedule",
                    action: "add",
                    intent: title,
                    success: false,
                    event_id: None,
                    error: Some(e.to_string()),
                },
            })
        }
        ScheduleAction::Update => {
            let title = extraction.title.clone()?;
            let event_id = extraction.event_id?;
            let update = ScheduleEventUpdate {
                title: None,
                event_date: extraction.event_date,
                event_time: extraction.event_time,
                description: extraction.description.clone(),
                importance: Some(extraction.importance),
                reminder_enabled: None,
                reminder_lead_minutes: None,
                recipient_email: None,
            };
            let result = store.update_schedule_event(event_id, &update);
            Some(match result {
                Ok(()) => AppliedAction {
                    category: "schedule",
                    action: "update",
                    intent: title,
                    success: true,
                    event_id: Some(event_id),
                    error: None,
                },
                Err(e) => AppliedAction {
                    category: "schedule",
                    action: "update",
                    intent: title,
                    success: false,
                    event_id: Some(event_id),
                    error: Some(e.to_string()),
                },
            })
        }
        ScheduleAction::Delete => {
            let title = extraction.title.clone()?;
            let event_id = extraction.event_id?;
            let result = store.delete_schedule_event(event_id);
            Some(match result {
                Ok(()) => AppliedAction {
                    category: "schedule",
                    action: "delete",
                    intent: title,
                    success: true,
                    event_id: Some(event_id),
                    error: None,
                },
                Err(e) => AppliedAction {
                    category: "schedule",
                    action: "delete",
                    intent: title,
                    success: false,
                    event_id: Some(event_id),
                    error: Some(e.to_string()),
                },
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rusqlite::Connection;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 15).unwrap()
    }

    fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new(Connection::open_in_memory().unwrap()).unwrap())
    }

    #[tokio::test]
    async fn extracted_memory_is_persisted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": r#"[{"category": "fact", "content": "Likes tea", "importance": 4}]"#
            })))
            .mount(&server)
            .await;

        let store = store();
        let config = ConfigStore::new(Arc::clone(&store));
        let llm = LlmClient::new(server.uri());

        let actions =
            apply_extraction(&store, &llm, &config, "alice", "I like tea", None, "sess-1", today()).await;

        assert_eq!(actions.len(), 1);
        assert!(actions[0].success);
        assert_eq!(actions[0].category, "memory");

        let memories = store.list_memories("alice", false, 10).unwrap();
        assert_eq!(memories.len(), 1);
        assert_eq!(memories[0].content, "Likes tea");
    }

    #[tokio::test]
    async fn schedule_add_is_applied() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": r#"{"action": "ADD", "title": "haircut", "date_expression": "next Friday", "time": "09:30"}"#
            })))
            .mount(&server)
            .await;

        let store = store();
        let config = ConfigStore::new(Arc::clone(&store));
        let llm = LlmClient::new(server.uri());

        let actions = apply_extraction(
            &store,
            &llm,
            &config,
            "alice",
            "Schedule me for next Friday at 9:30am for my haircut.",
            None,
            "sess-1",
            today(),
        )
        .await;

        let schedule_action = actions.iter().find(|a| a.category == "schedule").expect("a schedule action");
        assert!(schedule_action.success);

        let events = store.all_active_events("alice").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "haircut");
    }
}
