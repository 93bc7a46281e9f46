use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The identity a turn or memory is attributed to.
///
/// Stored as plain text everywhere (spec §3 `user_name`); wrapped so call
/// sites don't confuse it with channel-native identifiers (a Mumble session
/// id, a SIP caller, an e-mail address) which are resolved down to this
/// before anything touches the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserName(pub String);

impl UserName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Front-end a turn arrived through. Drives channel-specific prompt tone
/// and whether extraction runs synchronously (email) or in the background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Voice,
    Text,
    Email,
    AiChat,
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Voice => "voice",
            Self::Text => "text",
            Self::Email => "email",
            Self::AiChat => "ai_chat",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Modality {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "voice" => Ok(Self::Voice),
            "text" => Ok(Self::Text),
            "email" => Ok(Self::Email),
            "ai_chat" => Ok(Self::AiChat),
            other => Err(format!("unknown modality: {other}")),
        }
    }
}

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if *self == Self::User { "user" } else { "assistant" })
    }
}

impl FromStr for Role {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Whether a conversational thread is still live. `None` means the turn
/// predates topic tracking or topic tracking doesn't apply (e.g. email).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicState {
    Active,
    Resolved,
}

impl fmt::Display for TopicState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if *self == Self::Active { "active" } else { "resolved" })
    }
}

impl FromStr for TopicState {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "resolved" => Ok(Self::Resolved),
            other => Err(format!("unknown topic state: {other}")),
        }
    }
}

/// Persistent-memory category (spec §3 `persistent_memory.category`).
///
/// `ConsolidatedHistory` is not in the original enumeration — it is the
/// category C3's consolidation job (§4.3) writes summaries under, and is
/// kept distinct so context assembly (C6 §4.6 step 5) can recognize and
/// surface it specially if needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryCategory {
    Schedule,
    Fact,
    Task,
    Preference,
    Other,
    ConsolidatedHistory,
}

impl fmt::Display for MemoryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Schedule => "schedule",
            Self::Fact => "fact",
            Self::Task => "task",
            Self::Preference => "preference",
            Self::Other => "other",
            Self::ConsolidatedHistory => "consolidated_history",
        };
        write!(f, "{s}")
    }
}

impl FromStr for MemoryCategory {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "schedule" => Ok(Self::Schedule),
            "fact" => Ok(Self::Fact),
            "task" => Ok(Self::Task),
            "preference" => Ok(Self::Preference),
            "other" => Ok(Self::Other),
            "consolidated_history" => Ok(Self::ConsolidatedHistory),
            // Extraction post-validation (spec §4.5) coerces unknown categories
            // to `other` rather than rejecting the whole extraction.
            _ => Ok(Self::Other),
        }
    }
}

/// Lifecycle state of a logical session (spec §3 `logical_session.state`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Active,
    Idle,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Idle => "idle",
            Self::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

impl FromStr for SessionState {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "idle" => Ok(Self::Idle),
            "closed" => Ok(Self::Closed),
            other => Err(format!("unknown session state: {other}")),
        }
    }
}

/// TTS backend selection (spec §4.1 `tts_engine`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtsEngine {
    Piper,
    Silero,
    Chatterbox,
}

impl fmt::Display for TtsEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Piper => "piper",
            Self::Silero => "silero",
            Self::Chatterbox => "chatterbox",
        };
        write!(f, "{s}")
    }
}

impl FromStr for TtsEngine {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "piper" => Ok(Self::Piper),
            "silero" => Ok(Self::Silero),
            "chatterbox" => Ok(Self::Chatterbox),
            other => Err(format!("unknown tts engine: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modality_roundtrip() {
        for m in [Modality::Voice, Modality::Text, Modality::Email, Modality::AiChat] {
            assert_eq!(m.to_string().parse::<Modality>().unwrap(), m);
        }
    }

    #[test]
    fn unknown_category_coerces_to_other() {
        assert_eq!("bogus".parse::<MemoryCategory>().unwrap(), MemoryCategory::Other);
    }
}
