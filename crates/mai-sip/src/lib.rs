//! SIP/RTP channel adapter (C12, spec §4.12): a hand-rolled SIP signaling
//! state machine and RTP audio path — no third-party SIP stack, since this
//! is a core component whose wire formats the spec pins down exactly.

pub mod adapter;
pub mod error;
pub mod message;
pub mod mute;
pub mod rtp;
pub mod sdp;
pub mod state;
pub mod vad;

pub use adapter::{SipAdapter, SipAdapterConfig};
pub use error::SipError;
