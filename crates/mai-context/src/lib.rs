//! Context Builder (C6, spec §4.6): assembles the single prompt string
//! handed to C2 for one turn, from persona, schedule, memory, and
//! conversation-history sections tailored to the requesting channel.

pub mod action_summary;
pub mod builder;
pub mod error;
pub mod schedule_block;
pub mod types;

pub use builder::ContextBuilder;
pub use error::{ContextError, Result};
pub use types::{BuildRequest, ChannelProfile};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use mai_config::ConfigStore;
    use mai_llm::LlmClient;
    use mai_memory::{MemoryStore, Modality, Role};
    use rusqlite::Connection;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new(Connection::open_in_memory().unwrap()).unwrap())
    }

    #[tokio::test]
    async fn voice_always_shows_empty_schedule_section() {
        let store = store();
        let config = ConfigStore::new(Arc::clone(&store));
        let llm = LlmClient::new("http://127.0.0.1:1".into());
        let builder = ContextBuilder::new(&store, &config, &llm);

        let req = BuildRequest {
            user_name: "alice",
            session_id: "sess-1",
            turn_text: "good morning",
            channel: ChannelProfile::Voice,
            email_actions: None,
        };
        let prompt = builder.build(&req).await.unwrap();
        assert!(prompt.contains("Upcoming schedule"));
        assert!(prompt.contains("nothing scheduled"));
    }

    #[tokio::test]
    async fn text_omits_schedule_section_without_keyword() {
        let store = store();
        let config = ConfigStore::new(Arc::clone(&store));
        let llm = LlmClient::new("http://127.0.0.1:1".into());
        let builder = ContextBuilder::new(&store, &config, &llm);

        let req = BuildRequest {
            user_name: "alice",
            session_id: "sess-1",
            turn_text: "tell me a joke",
            channel: ChannelProfile::Text,
            email_actions: None,
        };
        let prompt = builder.build(&req).await.unwrap();
        assert!(!prompt.contains("Upcoming schedule"));
        assert!(!prompt.contains("Relevant schedule"));
    }

    #[tokio::test]
    async fn text_includes_schedule_section_with_keyword() {
        let store = store();
        let config = ConfigStore::new(Arc::clone(&store));
        let llm = LlmClient::new("http://127.0.0.1:1".into());
        let builder = ContextBuilder::new(&store, &config, &llm);

        let req = BuildRequest {
            user_name: "alice",
            session_id: "sess-1",
            turn_text: "what's on my calendar today",
            channel: ChannelProfile::Text,
            email_actions: None,
        };
        let prompt = builder.build(&req).await.unwrap();
        assert!(prompt.contains("No matching events found") || prompt.contains("Relevant schedule"));
    }

    #[tokio::test]
    async fn memories_and_history_sections_omitted_when_empty() {
        let store = store();
        let config = ConfigStore::new(Arc::clone(&store));
        let llm = LlmClient::new("http://127.0.0.1:1".into());
        let builder = ContextBuilder::new(&store, &config, &llm);

        let req = BuildRequest {
            user_name: "bob",
            session_id: "sess-new",
            turn_text: "hello there",
            channel: ChannelProfile::Text,
            email_actions: None,
        };
        let prompt = builder.build(&req).await.unwrap();
        assert!(!prompt.contains("Known facts about this user"));
        assert!(!prompt.contains("Recent conversation"));
        assert!(!prompt.contains("Background context"));
    }

    #[tokio::test]
    async fn short_term_section_includes_saved_turns() {
        let store = store();
        let config = ConfigStore::new(Arc::clone(&store));
        let llm = LlmClient::new("http://127.0.0.1:1".into());

        store
            .save_turn("carol", "sess-2", "sess-2", Modality::Text, Role::User, "what's your name", None)
            .unwrap();
        store
            .save_turn("carol", "sess-2", "sess-2", Modality::Text, Role::Assistant, "I'm MAI", None)
            .unwrap();

        let builder = ContextBuilder::new(&store, &config, &llm);
        let req = BuildRequest {
            user_name: "carol",
            session_id: "sess-2",
            turn_text: "nice to meet you",
            channel: ChannelProfile::Text,
            email_actions: None,
        };
        let prompt = builder.build(&req).await.unwrap();
        assert!(prompt.contains("Recent conversation"));
        assert!(prompt.contains("I'm MAI"));
    }

    #[tokio::test]
    async fn email_profile_includes_action_summary() {
        let store = store();
        let config = ConfigStore::new(Arc::clone(&store));
        let llm = LlmClient::new("http://127.0.0.1:1".into());
        let builder = ContextBuilder::new(&store, &config, &llm);

        let req = BuildRequest {
            user_name: "dave",
            session_id: "sess-3",
            turn_text: "thanks for adding that flight",
            channel: ChannelProfile::Email,
            email_actions: Some(&[]),
        };
        let prompt = builder.build(&req).await.unwrap();
        assert!(prompt.contains("No memory or schedule actions were taken"));
    }

    #[tokio::test]
    async fn long_term_recall_uses_embedding() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embedding": vec![0.1_f32; 8],
            })))
            .mount(&server)
            .await;

        let store = store();
        let config = ConfigStore::new(Arc::clone(&store));
        let llm = LlmClient::new(server.uri());

        store
            .save_turn("erin", "sess-old", "sess-old", Modality::Text, Role::User, "my dog is named Rex", None)
            .unwrap();
        let turns = store.recent_turns("sess-old", 1).unwrap();
        store.update_turn_embedding(turns[0].id, &[0.1_f32; 8]).unwrap();

        let builder = ContextBuilder::new(&store, &config, &llm);
        let req = BuildRequest {
            user_name: "erin",
            session_id: "sess-current",
            turn_text: "what's my dog's name",
            channel: ChannelProfile::Text,
            email_actions: None,
        };
        let prompt = builder.build(&req).await.unwrap();
        assert!(prompt.contains("Background context"));
        assert!(prompt.contains("Rex"));
    }
}
