//! SIP channel adapter (C12, spec §4.12). Owns one UDP socket for
//! signaling and one per-call UDP socket for RTP media; the only third
//! party here is `tokio`'s networking — the SIP/RTP wire formats are
//! hand-rolled in `message`/`sdp`/`rtp`.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use mai_audio::{mulaw, resample, rms, wav};
use mai_channels::channel::Channel;
use mai_channels::error::ChannelError;
use mai_channels::types::{ChannelStatus, OutboundMessage};
use mai_config::ConfigStore;
use mai_core::TtsEngine;
use mai_dialog::{ChannelKind, DialogOrchestrator};
use mai_speech::SpeechClient;
use rand::Rng;
use tokio::net::UdpSocket;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::SipError;
use crate::message::{build_response, SipMessage};
use crate::mute::{settle_duration, AntiFeedbackMute};
use crate::rtp::{RtpHeader, RtpSession, PT_PCMU};
use crate::sdp::{build_answer, parse_offer};
use crate::state::CallSession;
use crate::vad::{AdaptiveVad, VadEvent};

const SIP_RECV_BUF: usize = 4096;
const RTP_RECV_BUF: usize = 2048;
const WHISPER_HZ: u32 = 16_000;
const RTP_HZ: u32 = 8_000;
const MIN_UTTERANCE_RMS: f64 = 50.0;
const PEAK_TARGET: f64 = 0.9;
const CALL_GREETING_TOKEN: &str = "[[call started]]";

pub struct SipAdapterConfig {
    pub local_sip_addr: SocketAddr,
    pub local_media_ip: IpAddr,
    pub rtp_port_range: (u16, u16),
    pub contact_uri: String,
    pub greeting: String,
    pub manual_vad_threshold_rms: Option<f64>,
}

struct CallHandle {
    session: StdMutex<CallSession>,
    vad: StdMutex<AdaptiveVad>,
    mute: AntiFeedbackMute,
    rtp_session: StdMutex<RtpSession>,
    remote_sip_addr: SocketAddr,
    remote_rtp_addr: StdMutex<Option<SocketAddr>>,
    rtp_socket: Arc<UdpSocket>,
    caller: String,
    welcomed: AtomicBool,
}

pub struct SipAdapter {
    cfg: SipAdapterConfig,
    sip_socket: StdMutex<Option<Arc<UdpSocket>>>,
    calls: Arc<StdMutex<HashMap<String, Arc<CallHandle>>>>,
    dialog: Arc<DialogOrchestrator>,
    speech: Arc<SpeechClient>,
    config: Arc<ConfigStore>,
    status: StdMutex<ChannelStatus>,
}

impl SipAdapter {
    pub fn new(
        cfg: SipAdapterConfig,
        dialog: Arc<DialogOrchestrator>,
        speech: Arc<SpeechClient>,
        config: Arc<ConfigStore>,
    ) -> Self {
        Self {
            cfg,
            sip_socket: StdMutex::new(None),
            calls: Arc::new(StdMutex::new(HashMap::new())),
            dialog,
            speech,
            config,
            status: StdMutex::new(ChannelStatus::Disconnected),
        }
    }

    pub async fn run(&self) -> Result<(), SipError> {
        let socket = self.sip_socket.lock().unwrap().clone().ok_or_else(|| SipError::Socket(std::io::Error::new(std::io::ErrorKind::NotConnected, "sip socket not bound")))?;
        let mut buf = [0u8; SIP_RECV_BUF];
        loop {
            let (len, from) = socket.recv_from(&mut buf).await?;
            let raw = String::from_utf8_lossy(&buf[..len]).into_owned();
            let msg = match SipMessage::parse(&raw) {
                Ok(m) => m,
                Err(e) => {
                    warn!(error = %e, "dropping malformed sip datagram");
                    continue;
                }
            };
            if let Err(e) = self.dispatch(&socket, from, msg).await {
                warn!(error = %e, "sip dispatch failed");
            }
        }
    }

    async fn dispatch(&self, socket: &Arc<UdpSocket>, from: SocketAddr, msg: SipMessage) -> Result<(), SipError> {
        match msg.method() {
            Some("INVITE") => self.handle_invite(socket, from, &msg).await,
            Some("ACK") => self.handle_ack(&msg).await,
            Some("BYE") => self.handle_bye(socket, from, &msg).await,
            Some("CANCEL") => self.handle_cancel(socket, from, &msg).await,
            Some("OPTIONS") => {
                let resp = build_response(200, "OK", &msg, None, &self.cfg.contact_uri, None);
                socket.send_to(resp.as_bytes(), from).await?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn handle_invite(&self, socket: &Arc<UdpSocket>, from: SocketAddr, msg: &SipMessage) -> Result<(), SipError> {
        let call_id = msg.call_id().ok_or(SipError::MissingHeader("Call-ID"))?.to_string();
        let (cseq, _) = msg.cseq().ok_or(SipError::MissingHeader("CSeq"))?;

        let existing = self.calls.lock().unwrap().get(&call_id).cloned();
        if let Some(call) = &existing {
            let cached = call.session.lock().unwrap().observe_invite(cseq).map(str::to_string);
            if let Some(cached) = cached {
                socket.send_to(cached.as_bytes(), from).await?;
                return Ok(());
            }
        }

        let offer = parse_offer(&msg.body)?;
        let rtp_socket = self.allocate_rtp_socket().await?;
        let local_port = rtp_socket.local_addr()?.port();
        let answer_sdp = build_answer(&self.cfg.local_media_ip.to_string(), local_port);

        let from_tag = msg.from_tag().unwrap_or("unknown").to_string();
        let to_tag = format!("mai-{:x}", rand::thread_rng().gen::<u32>());
        let caller = caller_id(msg.header("From").unwrap_or(""));

        let session = match existing {
            Some(call) => {
                call.session.lock().unwrap().observe_invite(cseq);
                call
            }
            None => {
                let mut session = CallSession::new(call_id.clone(), from_tag, to_tag.clone());
                session.observe_invite(cseq);
                session.ring();
                let ssrc = rand::thread_rng().gen::<u32>();
                let handle = Arc::new(CallHandle {
                    session: StdMutex::new(session),
                    vad: StdMutex::new(AdaptiveVad::new(self.cfg.manual_vad_threshold_rms)),
                    mute: AntiFeedbackMute::new(),
                    rtp_session: StdMutex::new(RtpSession::new(ssrc, PT_PCMU)),
                    remote_sip_addr: from,
                    remote_rtp_addr: StdMutex::new(Some(SocketAddr::new(offer.remote_address.parse().unwrap_or(from.ip()), offer.remote_port))),
                    rtp_socket: Arc::new(rtp_socket),
                    caller,
                    welcomed: AtomicBool::new(false),
                });
                self.calls.lock().unwrap().insert(call_id.clone(), Arc::clone(&handle));
                handle
            }
        };

        session.session.lock().unwrap().answer();
        let response = build_response(200, "OK", msg, Some(&to_tag), &self.cfg.contact_uri, Some(&answer_sdp));
        session.session.lock().unwrap().cache_invite_response(response.clone());
        socket.send_to(response.as_bytes(), from).await?;
        info!(call_id, "invite answered, awaiting ack");
        Ok(())
    }

    async fn handle_ack(&self, msg: &SipMessage) -> Result<(), SipError> {
        let call_id = match msg.call_id() {
            Some(id) => id,
            None => return Ok(()),
        };
        let call = self.calls.lock().unwrap().get(call_id).cloned();
        let Some(call) = call else { return Ok(()) };

        let started = call.session.lock().unwrap().observe_ack();
        if !started {
            return Ok(());
        }

        let dialog = Arc::clone(&self.dialog);
        let speech = Arc::clone(&self.speech);
        let config = Arc::clone(&self.config);
        let calls = Arc::clone(&self.calls);
        let call_id = call_id.to_string();
        tokio::spawn(run_call(call, call_id, calls, dialog, speech, config, self.cfg.greeting.clone()));
        Ok(())
    }

    async fn handle_bye(&self, socket: &Arc<UdpSocket>, from: SocketAddr, msg: &SipMessage) -> Result<(), SipError> {
        let resp = build_response(200, "OK", msg, None, &self.cfg.contact_uri, None);
        socket.send_to(resp.as_bytes(), from).await?;
        if let Some(call_id) = msg.call_id() {
            if let Some(call) = self.calls.lock().unwrap().remove(call_id) {
                call.session.lock().unwrap().close();
            }
        }
        Ok(())
    }

    async fn handle_cancel(&self, socket: &Arc<UdpSocket>, from: SocketAddr, msg: &SipMessage) -> Result<(), SipError> {
        let resp = build_response(200, "OK", msg, None, &self.cfg.contact_uri, None);
        socket.send_to(resp.as_bytes(), from).await?;
        if let Some(call_id) = msg.call_id() {
            if let Some(call) = self.calls.lock().unwrap().remove(call_id) {
                call.session.lock().unwrap().begin_terminate();
                call.session.lock().unwrap().close();
            }
        }
        Ok(())
    }

    async fn allocate_rtp_socket(&self) -> Result<UdpSocket, SipError> {
        let (min, max) = self.cfg.rtp_port_range;
        for port in min..=max {
            let addr = SocketAddr::new(self.cfg.local_media_ip, port);
            if let Ok(socket) = UdpSocket::bind(addr).await {
                return Ok(socket);
            }
        }
        Err(SipError::NoRtpPortAvailable)
    }
}

/// Extract the user part of a `From:` header (`"Alice" <sip:+15551234@host>`)
/// for use as the caller's display identity.
fn caller_id(from_header: &str) -> String {
    from_header
        .split("sip:")
        .nth(1)
        .and_then(|rest| rest.split('@').next())
        .map(|s| s.to_string())
        .unwrap_or_else(|| from_header.to_string())
}

/// Drives one established call end to end: welcome flow, then the
/// listen/transcribe/reply loop, until the peer hangs up and the RTP socket
/// goes quiet or the call is removed from the table.
async fn run_call(
    call: Arc<CallHandle>,
    call_id: String,
    calls: Arc<StdMutex<HashMap<String, Arc<CallHandle>>>>,
    dialog: Arc<DialogOrchestrator>,
    speech: Arc<SpeechClient>,
    config: Arc<ConfigStore>,
    greeting: String,
) {
    play_welcome(&call, &dialog, &speech, &config, &greeting).await;

    let mut buf = [0u8; RTP_RECV_BUF];
    loop {
        if !calls.lock().unwrap().contains_key(&call_id) {
            return;
        }
        let recv = tokio::time::timeout(Duration::from_secs(30), call.rtp_socket.recv_from(&mut buf)).await;
        let Ok(Ok((len, remote))) = recv else {
            return;
        };
        *call.remote_rtp_addr.lock().unwrap() = Some(remote);

        if call.mute.is_muted() {
            continue;
        }
        if RtpHeader::decode(&buf[..len]).is_err() {
            continue;
        }
        let payload = &buf[crate::rtp::HEADER_LEN..len];
        let pcm = mulaw::decode(payload);

        let event = call.vad.lock().unwrap().process_frame(&pcm, Instant::now());
        if event == VadEvent::UtteranceEnd {
            let recording = call.vad.lock().unwrap().take_recording();
            handle_utterance(&call, &dialog, &speech, &config, recording).await;
        }
    }
}

async fn play_welcome(
    call: &Arc<CallHandle>,
    dialog: &Arc<DialogOrchestrator>,
    speech: &Arc<SpeechClient>,
    config: &Arc<ConfigStore>,
    greeting: &str,
) {
    speak(call, speech, config, greeting, true).await;

    match dialog.handle_turn(&call.caller, ChannelKind::Voice, &call_session_key(call), CALL_GREETING_TOKEN).await {
        Ok(outcome) => speak(call, speech, config, &outcome.reply, true).await,
        Err(e) => warn!(caller = %call.caller, error = %e, "personalized welcome generation failed"),
    }
    call.welcomed.store(true, Ordering::SeqCst);
}

fn call_session_key(call: &CallHandle) -> String {
    format!("sip:{}", call.caller)
}

async fn handle_utterance(
    call: &Arc<CallHandle>,
    dialog: &Arc<DialogOrchestrator>,
    speech: &Arc<SpeechClient>,
    config: &Arc<ConfigStore>,
    pcm_8k: Vec<i16>,
) {
    if pcm_8k.is_empty() {
        return;
    }
    let resampled = match resample::resample_mono(&pcm_8k, RTP_HZ, WHISPER_HZ) {
        Ok(p) => p,
        Err(e) => {
            warn!(caller = %call.caller, error = %e, "failed to upsample sip utterance for whisper");
            return;
        }
    };
    if rms::rms(&resampled) < MIN_UTTERANCE_RMS {
        return;
    }
    let mut normalized = resampled;
    rms::normalize_peak(&mut normalized, PEAK_TARGET);

    let wav_bytes = match wav::write_mono_wav(&normalized, WHISPER_HZ) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(caller = %call.caller, error = %e, "failed to encode sip utterance wav");
            return;
        }
    };

    let language = config.whisper_language();
    let transcript = match speech.transcribe(wav_bytes, &language).await {
        Ok(t) => t,
        Err(e) => {
            warn!(caller = %call.caller, error = %e, "whisper transcription failed for sip call");
            return;
        }
    };
    if transcript.text.trim().is_empty() || mai_speech::is_known_hallucination(&transcript.text) {
        return;
    }

    speak(call, speech, config, "Let me think about that...", false).await;

    let outcome = match dialog.handle_turn(&call.caller, ChannelKind::Voice, &call_session_key(call), &transcript.text).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(caller = %call.caller, error = %e, "dialog turn failed for sip utterance");
            return;
        }
    };
    speak(call, speech, config, &outcome.reply, false).await;
}

fn tts_voice(config: &ConfigStore) -> Option<String> {
    match config.tts_engine() {
        TtsEngine::Piper => Some(config.piper_voice()),
        TtsEngine::Silero => Some(config.silero_voice()),
        TtsEngine::Chatterbox => None,
    }
}

/// Synthesize `text`, mute the call for the duration of playback, pace the
/// μ-law RTP frames at 20ms, then hold the anti-feedback settle window
/// before re-arming the microphone (spec §4.12 "Anti-feedback muting").
async fn speak(call: &Arc<CallHandle>, speech: &Arc<SpeechClient>, config: &Arc<ConfigStore>, text: &str, is_welcome: bool) {
    let voice = tts_voice(config);
    let wav_bytes = match speech.synthesize(text, voice.as_deref()).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(caller = %call.caller, error = %e, "tts synthesis failed on sip call");
            return;
        }
    };
    let (pcm, source_rate) = match wav::read_mono_wav(&wav_bytes) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!(caller = %call.caller, error = %e, "failed to decode tts wav for sip call");
            return;
        }
    };
    let resampled = match resample::resample_mono(&pcm, source_rate, RTP_HZ) {
        Ok(samples) => samples,
        Err(e) => {
            warn!(caller = %call.caller, error = %e, "failed to downsample tts audio for sip call");
            return;
        }
    };

    let Some(remote) = *call.remote_rtp_addr.lock().unwrap() else { return };
    call.mute.mute();

    for frame in resampled.chunks(crate::rtp::SAMPLES_PER_FRAME) {
        let payload = mulaw::encode(frame);
        let packet = call.rtp_session.lock().unwrap().next_packet(&payload);
        if let Err(e) = call.rtp_socket.send_to(&packet, remote).await {
            warn!(caller = %call.caller, error = %e, "failed to send tts rtp frame");
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }

    sleep(settle_duration(is_welcome)).await;
    call.vad.lock().unwrap().take_recording();
    call.vad.lock().unwrap().reset_calibration(Instant::now());
    call.mute.unmute();
}

#[async_trait]
impl Channel for SipAdapter {
    fn name(&self) -> &str {
        "sip"
    }

    async fn connect(&mut self) -> Result<(), ChannelError> {
        *self.status.lock().unwrap() = ChannelStatus::Connecting;
        let socket = UdpSocket::bind(self.cfg.local_sip_addr).await.map_err(SipError::Socket).map_err(ChannelError::from)?;
        *self.sip_socket.lock().unwrap() = Some(Arc::new(socket));
        *self.status.lock().unwrap() = ChannelStatus::Connected;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), ChannelError> {
        *self.sip_socket.lock().unwrap() = None;
        self.calls.lock().unwrap().clear();
        *self.status.lock().unwrap() = ChannelStatus::Disconnected;
        Ok(())
    }

    async fn send(&self, _msg: &OutboundMessage) -> Result<(), ChannelError> {
        Err(ChannelError::Invariant("sip channel has no out-of-band send path outside an active call".into()))
    }

    fn status(&self) -> ChannelStatus {
        self.status.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_id_extracts_user_part_of_from_header() {
        assert_eq!(caller_id("\"Alice\" <sip:+15551234@192.168.1.20>;tag=abc"), "+15551234");
    }

    #[test]
    fn caller_id_falls_back_to_raw_header_when_unparseable() {
        assert_eq!(caller_id("garbage"), "garbage");
    }
}
