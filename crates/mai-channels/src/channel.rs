use async_trait::async_trait;

use crate::error::ChannelError;
use crate::types::{ChannelStatus, OutboundMessage};

/// Common interface implemented by every frontend adapter (Mumble, SIP,
/// e-mail). Each channel normalizes its native events into [`crate::types::InboundMessage`]
/// and drives them through `mai-dialog` itself; this trait only covers the
/// parts a supervisor needs to manage the adapter's lifecycle (spec §4.11
/// "Health": periodic probes and reconnect).
#[async_trait]
pub trait Channel: Send + Sync {
    /// Stable lowercase identifier, e.g. `"mumble"`, `"sip"`, `"email"`.
    fn name(&self) -> &str;

    async fn connect(&mut self) -> Result<(), ChannelError>;

    async fn disconnect(&mut self) -> Result<(), ChannelError>;

    /// Deliver one reply. `&self` so a connected adapter can send
    /// concurrently with its own inbound-handling loop.
    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError>;

    fn status(&self) -> ChannelStatus;
}
