use mai_context::ChannelProfile;

/// Front end a turn arrived through (spec §4.7). Maps onto the context
/// builder's channel profile; e-mail additionally changes the turn order
/// (see [`crate::orchestrator::DialogOrchestrator::handle_email_turn`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Voice,
    Text,
    Email,
}

impl ChannelKind {
    pub fn modality(self) -> mai_core::Modality {
        match self {
            ChannelKind::Voice => mai_core::Modality::Voice,
            ChannelKind::Text => mai_core::Modality::Text,
            ChannelKind::Email => mai_core::Modality::Email,
        }
    }

    pub fn context_profile(self) -> ChannelProfile {
        match self {
            ChannelKind::Voice => ChannelProfile::Voice,
            ChannelKind::Text => ChannelProfile::Text,
            ChannelKind::Email => ChannelProfile::Email,
        }
    }
}

/// Outcome of one full turn (spec §4.7 step 6).
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub session_id: String,
    pub reply: String,
}
