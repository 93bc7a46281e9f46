//! Mumble voice channel (C11, spec §4.11): text chat and per-speaker voice
//! capture, both driven through `mai-dialog`.

pub mod adapter;
pub mod error;
pub mod health;
pub mod text;
pub mod transport;
pub mod voice;

pub use adapter::MumbleAdapter;
pub use error::MumbleError;
pub use transport::{LiveMumbleTransport, MumbleEvent, MumbleTransport};
