//! Dependency-free DSP primitives shared by the voice channels: the G.711
//! codec and RTP-pacing helpers for SIP (spec §4.12), plus the resampling
//! and WAV framing used on the Mumble capture path (spec §4.11).
//!
//! Everything here is a pure function over in-memory PCM buffers; channel
//! crates own the I/O and timing.

pub mod error;
pub mod mulaw;
pub mod resample;
pub mod rms;
pub mod wav;

pub use error::{AudioError, Result};
