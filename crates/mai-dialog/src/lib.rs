//! Dialog Orchestrator (C7, spec §4.7): the per-turn state machine shared
//! by every channel frontend (C11/C12/C13).

pub mod email_actions;
pub mod error;
pub mod extraction;
pub mod orchestrator;
pub mod types;

pub use error::{DialogError, Result};
pub use orchestrator::DialogOrchestrator;
pub use types::{ChannelKind, TurnOutcome};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use mai_config::ConfigStore;
    use mai_llm::LlmClient;
    use mai_memory::MemoryStore;
    use mai_sessions::SessionManager;
    use rusqlite::Connection;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn orchestrator(base_url: String) -> (DialogOrchestrator, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new(Connection::open_in_memory().unwrap()).unwrap());
        let config = Arc::new(ConfigStore::new(Arc::clone(&store)));
        let llm = Arc::new(LlmClient::new(base_url));
        let sessions = Arc::new(SessionManager::new(Arc::clone(&store), Arc::clone(&config)));
        let dialog = DialogOrchestrator::new(Arc::clone(&store), config, llm, sessions);
        (dialog, store)
    }

    #[tokio::test]
    async fn handle_turn_persists_both_sides_and_returns_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "Good morning!"
            })))
            .mount(&server)
            .await;

        let (dialog, store) = orchestrator(server.uri()).await;
        let outcome = dialog.handle_turn("alice", ChannelKind::Text, "alice-ws-1", "good morning").await.unwrap();
        assert_eq!(outcome.reply, "Good morning!");

        // Assistant turn is saved fire-and-forget; give the spawned task a beat.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let turns = store.recent_turns(&outcome.session_id, 10).unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].message, "good morning");
        assert_eq!(turns[1].message, "Good morning!");
    }

    #[tokio::test]
    async fn repeated_turns_reuse_the_same_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "response": "ok" })))
            .mount(&server)
            .await;

        let (dialog, _store) = orchestrator(server.uri()).await;
        let first = dialog.handle_turn("bob", ChannelKind::Voice, "bob-chan", "hi").await.unwrap();
        let second = dialog.handle_turn("bob", ChannelKind::Voice, "bob-chan", "hi again").await.unwrap();
        assert_eq!(first.session_id, second.session_id);
    }

    #[tokio::test]
    async fn email_turn_runs_extraction_before_generation_and_reports_it() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": r#"{"action": "NOTHING"}"#
            })))
            .mount(&server)
            .await;

        let (dialog, store) = orchestrator(server.uri()).await;
        let (outcome, applied) =
            dialog.handle_email_turn("carol", "carol@example.com", "just saying hi").await.unwrap();

        assert!(applied.is_empty());
        let turns = store.recent_turns(&outcome.session_id, 10).unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].role, mai_core::Role::Assistant);
    }
}
