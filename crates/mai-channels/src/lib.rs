//! Shared channel contract used by `mai-mumble`, `mai-sip`, and `mai-email`
//! (spec §2 "Data flow": each frontend normalizes its native events to a
//! text turn + identity before handing off to `mai-dialog`).

pub mod channel;
pub mod error;
pub mod manager;
pub mod types;

pub use channel::Channel;
pub use error::ChannelError;
pub use manager::ReconnectGuard;
pub use types::{ChannelStatus, InboundMessage, OutboundMessage};
