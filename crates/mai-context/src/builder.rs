//! Context Builder (C6, spec §4.6): assembles the single prompt string
//! handed to C2.generate for one turn. Sections are assembled in the
//! spec's order and omitted when empty.

use chrono::Utc;
use mai_config::ConfigStore;
use mai_core::time::{format_local, format_long_date, resolve_tz};
use mai_llm::{EmbedOptions, LlmClient};
use mai_memory::MemoryStore;
use tracing::warn;

use crate::types::{BuildRequest, ChannelProfile};
use crate::{action_summary, schedule_block, Result};

const MAX_PERSISTENT_MEMORIES: u32 = 20;

pub struct ContextBuilder<'a> {
    store: &'a MemoryStore,
    config: &'a ConfigStore,
    llm: &'a LlmClient,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(store: &'a MemoryStore, config: &'a ConfigStore, llm: &'a LlmClient) -> Self {
        Self { store, config, llm }
    }

    pub async fn build(&self, req: &BuildRequest<'_>) -> Result<String> {
        let tz = resolve_tz(&self.config.display_timezone());
        let now = Utc::now();
        let reference_date = now.with_timezone(&tz).date_naive();

        let mut sections = Vec::new();
        sections.push(system_rules(req.channel));
        sections.push(format!("Current date and time: {} ({})", format_long_date(now, tz), format_local(now, tz)));
        sections.push(format!("Persona: {}", self.config.bot_persona()));

        if let Some(schedule) = self.schedule_section(req, reference_date).await {
            sections.push(schedule);
        }

        if let Some(memories) = self.memories_section(req.user_name)? {
            sections.push(memories);
        }

        if req.channel.includes_action_summary() {
            if let Some(actions) = req.email_actions {
                sections.push(action_summary::format(actions));
            }
        }

        if let Some(long_term) = self.long_term_section(req).await? {
            sections.push(long_term);
        }

        if let Some(short_term) = self.short_term_section(req)? {
            sections.push(short_term);
        }

        sections.push(format!("User: {}", req.turn_text));

        Ok(sections.join("\n\n"))
    }

    async fn schedule_section(&self, req: &BuildRequest<'_>, reference_date: chrono::NaiveDate) -> Option<String> {
        if req.channel.always_includes_schedule() {
            let horizon = reference_date + chrono::Duration::days(30);
            let events = self.store.list_schedule(req.user_name, reference_date, Some(horizon), 200).ok()?;
            return Some(schedule_block::format_grouped_view(&events, reference_date));
        }

        if !schedule_block::wants_schedule_block(req.turn_text) {
            return None;
        }

        if let Some(target) = schedule_block::when_is_my_query(req.turn_text) {
            let model = self.config.memory_extraction_model();
            let results =
                mai_scheduler::search(self.store, self.llm, &model, req.user_name, &target, None, None)
                    .await
                    .unwrap_or_default();
            let events: Vec<_> = results.into_iter().map(|scored| scored.event).collect();
            return Some(schedule_block::format_flat_view(&events));
        }

        let window = schedule_block::month_filter(req.turn_text, reference_date)
            .or_else(|| schedule_block::time_window_filter(req.turn_text, reference_date));
        let (start, end) = window.unwrap_or((reference_date, reference_date + chrono::Duration::days(30)));

        let mut events = self.store.list_schedule(req.user_name, start, Some(end), 200).ok()?;
        if let Some(keywords) = schedule_block::category_filter(req.turn_text) {
            events.retain(|e| schedule_block::event_matches_category(e, keywords));
        }
        Some(schedule_block::format_flat_view(&events))
    }

    fn memories_section(&self, user_name: &str) -> Result<Option<String>> {
        let memories = self.store.list_memories(user_name, true, MAX_PERSISTENT_MEMORIES)?;
        if memories.is_empty() {
            return Ok(None);
        }
        let mut out = String::from("Known facts about this user (ordered by importance):\n");
        for memory in memories {
            out.push_str(&format!("- [{}] {}\n", memory.category, memory.content));
        }
        Ok(Some(out))
    }

    async fn long_term_section(&self, req: &BuildRequest<'_>) -> Result<Option<String>> {
        let limit = self.config.long_term_memory_limit();
        if limit == 0 {
            return Ok(None);
        }
        let opts = EmbedOptions { model: self.config.embedding_model(), ..Default::default() };
        let embedding = match self.llm.embed(req.turn_text, &opts).await {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "long-term recall: embedding failed, skipping section");
                return Ok(None);
            }
        };
        let threshold = self.config.semantic_similarity_threshold() as f32;
        let turns =
            self.store
                .semantic_recall(req.user_name, &embedding, req.session_id, limit, threshold)?;
        if turns.is_empty() {
            return Ok(None);
        }
        let mut out =
            String::from("Background context from past conversations — do not bring up unless asked:\n");
        for turn in turns {
            out.push_str(&format!("- {}: {}\n", turn.role, turn.message));
        }
        Ok(Some(out))
    }

    fn short_term_section(&self, req: &BuildRequest<'_>) -> Result<Option<String>> {
        let limit = self.config.short_term_memory_limit();
        if limit == 0 {
            return Ok(None);
        }
        let turns = self.store.recent_turns(req.session_id, limit)?;
        if turns.is_empty() {
            return Ok(None);
        }
        let mut out = String::from("Recent conversation:\n");
        for turn in turns {
            out.push_str(&format!("{}: {}\n", turn.role, turn.message));
        }
        Ok(Some(out))
    }
}

/// Per-channel system rules (spec §4.6 step 1, Design note "Channel-specific
/// prompts": brevity/tone are load-bearing and tuned separately, never
/// collapsed into one template).
fn system_rules(channel: ChannelProfile) -> String {
    let brevity = match channel {
        ChannelProfile::Voice => "Respond in 1-2 sentences, spoken naturally.",
        ChannelProfile::Text => "Respond concisely.",
        ChannelProfile::Email => {
            "Respond in under 100 words. No formal salutations. Report only what the action \
             log shows, using correct ownership (\"I added\", not \"thank you for adding\")."
        }
    };
    format!(
        "System rules: {brevity} Always be truthful and stay grounded in the information \
         provided below. Never use emoji. Do not repeat yourself. Do not summarize this \
         conversation back to the user."
    )
}
