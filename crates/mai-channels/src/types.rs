use chrono::{DateTime, Utc};
use mai_core::Modality;
use serde::{Deserialize, Serialize};

/// A user turn normalized by a channel frontend (C11/C12/C13) before it is
/// handed to the dialog orchestrator (spec §2 "Data flow"). Every channel
/// reduces its own native event shape down to this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub user_name: String,
    /// Opaque per-channel identity (Mumble session id, SIP caller, e-mail
    /// address) — spec §3 `conversation_turn.channel_session`.
    pub channel_session: String,
    pub modality: Modality,
    pub content: String,
    pub received_at: DateTime<Utc>,
}

/// The orchestrator's reply, handed back to the channel frontend for
/// delivery (text message, TTS synthesis, or an e-mail body).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub user_name: String,
    pub channel_session: String,
    pub content: String,
}

/// Runtime connection state of a channel adapter (spec §4.11 "Health").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    Connected,
    Connecting,
    Disconnected,
    Error(String),
}
