use mai_memory::EmailAction;

/// Which front end the prompt is assembled for (spec §4.6, Design note
/// "Channel-specific prompts"). Drives both the brevity/tone rules in the
/// system-rules section and whether the schedule block (§4.6 step 4) is
/// unconditional or keyword-gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelProfile {
    /// Always includes the full 30-day schedule view.
    Voice,
    /// Schedule block only appears when the turn matches schedule-intent
    /// keywords (§4.6 step 4 "conditional paths").
    Text,
    /// Same conditional schedule gating as `Text`, plus the action-summary
    /// section (§4.6 step 6) and a <100-word brevity rule (§4.13).
    Email,
}

impl ChannelProfile {
    pub fn includes_action_summary(self) -> bool {
        matches!(self, ChannelProfile::Email)
    }

    pub fn always_includes_schedule(self) -> bool {
        matches!(self, ChannelProfile::Voice)
    }
}

/// Everything the context builder needs for one turn (spec §4.6 "Input").
pub struct BuildRequest<'a> {
    pub user_name: &'a str,
    pub session_id: &'a str,
    pub turn_text: &'a str,
    pub channel: ChannelProfile,
    /// Action log for this inbound message, e-mail only (spec §4.6 step 6).
    pub email_actions: Option<&'a [EmailAction]>,
}
