//! Dialog Orchestrator (C7, spec §4.7): the one per-turn state machine every
//! channel frontend drives. Voice and text spawn extraction in the
//! background; e-mail runs it synchronously first so the reply can report
//! on it (spec §4.13).

use std::sync::Arc;

use chrono::Utc;
use mai_config::ConfigStore;
use mai_context::{BuildRequest, ContextBuilder};
use mai_core::time::resolve_tz;
use mai_core::Role;
use mai_llm::{GenerateOptions, LlmClient};
use mai_memory::{EmailAction, MemoryStore};
use mai_sessions::SessionManager;
use tracing::{info, warn};

use crate::extraction::{apply_extraction, AppliedAction};
use crate::types::{ChannelKind, TurnOutcome};
use crate::Result;

pub struct DialogOrchestrator {
    store: Arc<MemoryStore>,
    config: Arc<ConfigStore>,
    llm: Arc<LlmClient>,
    sessions: Arc<SessionManager>,
}

impl DialogOrchestrator {
    pub fn new(
        store: Arc<MemoryStore>,
        config: Arc<ConfigStore>,
        llm: Arc<LlmClient>,
        sessions: Arc<SessionManager>,
    ) -> Self {
        Self { store, config, llm, sessions }
    }

    fn reference_date(&self) -> chrono::NaiveDate {
        let tz = resolve_tz(&self.config.display_timezone());
        Utc::now().with_timezone(&tz).date_naive()
    }

    /// Standard turn flow for voice/text (spec §4.7 steps 1-6): save the
    /// user turn synchronously, build the prompt, generate, save the
    /// assistant turn, then spawn extraction in the background.
    pub async fn handle_turn(
        &self,
        user_name: &str,
        channel: ChannelKind,
        channel_session: &str,
        turn_text: &str,
    ) -> Result<TurnOutcome> {
        debug_assert!(channel != ChannelKind::Email, "e-mail must use handle_email_turn");

        let session_id = self.sessions.get_or_create(user_name)?;

        self.store.save_turn(
            user_name,
            channel_session,
            &session_id,
            channel.modality(),
            Role::User,
            turn_text,
            None,
        )?;

        let reply = self.generate_reply(user_name, &session_id, channel, turn_text, None).await?;

        let store = Arc::clone(&self.store);
        let user = user_name.to_string();
        let channel_session_owned = channel_session.to_string();
        let session_id_owned = session_id.clone();
        let modality = channel.modality();
        let reply_for_save = reply.clone();
        tokio::spawn(async move {
            if let Err(e) = store.save_turn(
                &user,
                &channel_session_owned,
                &session_id_owned,
                modality,
                Role::Assistant,
                &reply_for_save,
                None,
            ) {
                warn!(user_name = %user, error = %e, "failed to persist assistant turn");
            }
        });

        self.spawn_background_extraction(user_name, turn_text, Some(reply.as_str()), &session_id);

        Ok(TurnOutcome { session_id, reply })
    }

    /// E-mail's departure from the standard order (spec §4.13): extraction
    /// runs between saving the user turn and building the prompt, and its
    /// results are handed to the context builder as the action-summary
    /// section instead of being logged in the background.
    pub async fn handle_email_turn(
        &self,
        user_name: &str,
        channel_session: &str,
        turn_text: &str,
    ) -> Result<(TurnOutcome, Vec<AppliedAction>)> {
        let session_id = self.sessions.get_or_create(user_name)?;

        self.store.save_turn(
            user_name,
            channel_session,
            &session_id,
            mai_core::Modality::Email,
            Role::User,
            turn_text,
            None,
        )?;

        let applied = apply_extraction(
            &self.store,
            &self.llm,
            &self.config,
            user_name,
            turn_text,
            None,
            &session_id,
            self.reference_date(),
        )
        .await;

        let reply = self
            .generate_reply_with_actions(user_name, &session_id, turn_text, &applied)
            .await?;

        self.store.save_turn(
            user_name,
            channel_session,
            &session_id,
            mai_core::Modality::Email,
            Role::Assistant,
            &reply,
            None,
        )?;

        Ok((TurnOutcome { session_id, reply }, applied))
    }

    async fn generate_reply(
        &self,
        user_name: &str,
        session_id: &str,
        channel: ChannelKind,
        turn_text: &str,
        email_actions: Option<&[EmailAction]>,
    ) -> Result<String> {
        let builder = ContextBuilder::new(&self.store, &self.config, &self.llm);
        let req = BuildRequest {
            user_name,
            session_id,
            turn_text,
            channel: channel.context_profile(),
            email_actions,
        };
        let prompt = builder.build(&req).await?;

        let opts = GenerateOptions { model: self.config.ollama_model(), ..Default::default() };
        let reply = self.llm.generate(&prompt, &opts).await?;
        info!(user_name, session_id, "turn completed");
        Ok(reply)
    }

    /// E-mail generates its reply against a translated action summary, not
    /// the raw [`AppliedAction`] list — the context builder's e-mail profile
    /// expects `mai_memory::EmailAction` rows because that's what the
    /// channel's own action log persists (spec §4.6 step 6, §4.13).
    async fn generate_reply_with_actions(
        &self,
        user_name: &str,
        session_id: &str,
        turn_text: &str,
        applied: &[AppliedAction],
    ) -> Result<String> {
        let email_actions = crate::email_actions::to_email_actions(applied);
        self.generate_reply(user_name, session_id, ChannelKind::Email, turn_text, Some(&email_actions))
            .await
    }

    fn spawn_background_extraction(
        &self,
        user_name: &str,
        turn_text: &str,
        assistant_reply: Option<&str>,
        session_id: &str,
    ) {
        let store = Arc::clone(&self.store);
        let llm = Arc::clone(&self.llm);
        let config = Arc::clone(&self.config);
        let user = user_name.to_string();
        let turn = turn_text.to_string();
        let reply = assistant_reply.map(str::to_string);
        let session = session_id.to_string();
        let reference_date = self.reference_date();

        tokio::spawn(async move {
            let actions =
                apply_extraction(&store, &llm, &config, &user, &turn, reply.as_deref(), &session, reference_date)
                    .await;
            for action in &actions {
                if action.success {
                    info!(user_name = %user, category = action.category, action = action.action, "extraction applied");
                } else {
                    warn!(user_name = %user, category = action.category, error = ?action.error, "extraction failed");
                }
            }
        });
    }
}
