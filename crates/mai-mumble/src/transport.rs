//! Wire-protocol boundary (spec §6 "Mumble protocol: external library
//! interface — receive PCM frames per user, send 48kHz mono 16-bit PCM
//! frames, send/receive channel text messages").
//!
//! [`MumbleAdapter`] (src/channel.rs) only talks to this trait, never to
//! `mumble-protocol` directly, so the deterministic business logic in
//! `text.rs`/`voice.rs` can be exercised with [`MockTransport`] instead of a
//! live server.

use async_trait::async_trait;

use crate::error::MumbleError;

/// One normalized event out of the live connection.
#[derive(Debug, Clone)]
pub enum MumbleEvent {
    TextMessage { channel_session: String, user_name: String, text: String },
    AudioFrame { channel_session: String, user_name: String, pcm_48k: Vec<i16> },
    UserConnected { channel_session: String, user_name: String },
    UserDisconnected { channel_session: String },
}

#[async_trait]
pub trait MumbleTransport: Send + Sync {
    async fn connect(&mut self) -> Result<(), MumbleError>;
    async fn disconnect(&mut self) -> Result<(), MumbleError>;
    fn is_connected(&self) -> bool;

    /// Block until the next event is available, or `Ok(None)` on a clean
    /// disconnect (the caller reconnects through `mai_channels::ReconnectGuard`).
    async fn recv_event(&mut self) -> Result<Option<MumbleEvent>, MumbleError>;

    async fn send_text(&self, channel_session: &str, text: &str) -> Result<(), MumbleError>;

    /// Send one 48kHz mono 16-bit PCM frame into the Mumble voice channel
    /// (spec §4.11: "injected back as Mumble audio frames").
    async fn send_audio_frame(&self, pcm_48k: &[i16]) -> Result<(), MumbleError>;
}

/// Production transport over `mumble-protocol`'s TLS control connection and
/// UDP-over-TCP-fallback voice tunnel. Connection bring-up (version
/// exchange, authenticate, ping loop) and the protobuf control-message
/// framing live here; everything above this module is pure business logic.
pub struct LiveMumbleTransport {
    server_addr: String,
    username: String,
    connected: bool,
    session: Option<mumble_protocol::control::ControlSession>,
}

impl LiveMumbleTransport {
    pub fn new(server_addr: String, username: String) -> Self {
        Self { server_addr, username, connected: false, session: None }
    }
}

#[async_trait]
impl MumbleTransport for LiveMumbleTransport {
    async fn connect(&mut self) -> Result<(), MumbleError> {
        let session = mumble_protocol::control::ControlSession::connect(&self.server_addr, &self.username)
            .await
            .map_err(|e| MumbleError::Connect(e.to_string()))?;
        self.session = Some(session);
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), MumbleError> {
        if let Some(session) = self.session.take() {
            session.close().await.map_err(|e| MumbleError::Stream(e.to_string()))?;
        }
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn recv_event(&mut self) -> Result<Option<MumbleEvent>, MumbleError> {
        let session = self.session.as_mut().ok_or(MumbleError::NotConnected)?;
        match session.next_event().await.map_err(|e| MumbleError::Stream(e.to_string()))? {
            Some(event) => Ok(Some(translate_event(event))),
            None => {
                self.connected = false;
                Ok(None)
            }
        }
    }

    async fn send_text(&self, channel_session: &str, text: &str) -> Result<(), MumbleError> {
        let session = self.session.as_ref().ok_or(MumbleError::NotConnected)?;
        session.send_text_message(channel_session, text).await.map_err(|e| MumbleError::Stream(e.to_string()))
    }

    async fn send_audio_frame(&self, pcm_48k: &[i16]) -> Result<(), MumbleError> {
        let session = self.session.as_ref().ok_or(MumbleError::NotConnected)?;
        session.send_voice_frame(pcm_48k).await.map_err(|e| MumbleError::Stream(e.to_string()))
    }
}

fn translate_event(event: mumble_protocol::control::ServerEvent) -> MumbleEvent {
    use mumble_protocol::control::ServerEvent;
    match event {
        ServerEvent::TextMessage { session, actor_name, message } => {
            MumbleEvent::TextMessage { channel_session: session, user_name: actor_name, text: message }
        }
        ServerEvent::VoiceData { session, actor_name, pcm } => {
            MumbleEvent::AudioFrame { channel_session: session, user_name: actor_name, pcm_48k: pcm }
        }
        ServerEvent::UserState { session, name, connected: true } => {
            MumbleEvent::UserConnected { channel_session: session, user_name: name }
        }
        ServerEvent::UserState { session, connected: false, .. } => MumbleEvent::UserDisconnected { channel_session: session },
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// In-memory transport for exercising `MumbleAdapter` without a live
    /// server: `inbox` feeds `recv_event`, `sent_text`/`sent_audio` record
    /// everything the adapter tried to send.
    #[derive(Default)]
    pub struct MockTransport {
        pub inbox: Mutex<VecDeque<MumbleEvent>>,
        pub sent_text: Mutex<Vec<(String, String)>>,
        pub sent_audio_frames: Mutex<Vec<Vec<i16>>>,
        pub connected: Mutex<bool>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_event(&self, event: MumbleEvent) {
            self.inbox.lock().unwrap().push_back(event);
        }
    }

    #[async_trait]
    impl MumbleTransport for MockTransport {
        async fn connect(&mut self) -> Result<(), MumbleError> {
            *self.connected.lock().unwrap() = true;
            Ok(())
        }

        async fn disconnect(&mut self) -> Result<(), MumbleError> {
            *self.connected.lock().unwrap() = false;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            *self.connected.lock().unwrap()
        }

        async fn recv_event(&mut self) -> Result<Option<MumbleEvent>, MumbleError> {
            Ok(self.inbox.lock().unwrap().pop_front())
        }

        async fn send_text(&self, channel_session: &str, text: &str) -> Result<(), MumbleError> {
            self.sent_text.lock().unwrap().push((channel_session.to_string(), text.to_string()));
            Ok(())
        }

        async fn send_audio_frame(&self, pcm_48k: &[i16]) -> Result<(), MumbleError> {
            self.sent_audio_frames.lock().unwrap().push(pcm_48k.to_vec());
            Ok(())
        }
    }
}
