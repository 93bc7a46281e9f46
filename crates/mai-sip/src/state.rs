//! Per-call signaling state machine (spec §4.12 "Signaling state machine
//! per call"): Idle → Trying → Ringing → Answered → Established →
//! Terminating → Closed.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Idle,
    Trying,
    Ringing,
    Answered,
    Established,
    Terminating,
    Closed,
}

/// One call's signaling state plus the bookkeeping needed to answer
/// retransmissions idempotently (spec: "On retransmitted INVITE (same
/// Call-ID): re-send cached responses"; "start the session once (idempotent
/// against ACK retransmissions)").
pub struct CallSession {
    pub call_id: String,
    pub from_tag: String,
    pub to_tag: String,
    pub state: CallState,
    last_invite_cseq: Option<u32>,
    cached_invite_response: Option<String>,
    established_once: bool,
}

impl CallSession {
    pub fn new(call_id: String, from_tag: String, to_tag: String) -> Self {
        Self {
            call_id,
            from_tag,
            to_tag,
            state: CallState::Idle,
            last_invite_cseq: None,
            cached_invite_response: None,
            established_once: false,
        }
    }

    /// Record a (re)transmitted INVITE. Returns `Some(cached_response)` if
    /// this is a retransmission the caller should just re-send verbatim, or
    /// `None` if it's the first time and the caller should run the normal
    /// INVITE handling (100 Trying, SDP negotiation, etc).
    pub fn observe_invite(&mut self, cseq: u32) -> Option<&str> {
        if self.last_invite_cseq == Some(cseq) {
            self.cached_invite_response.as_deref()
        } else {
            self.last_invite_cseq = Some(cseq);
            self.state = CallState::Trying;
            None
        }
    }

    pub fn cache_invite_response(&mut self, response: String) {
        self.cached_invite_response = Some(response);
    }

    pub fn ring(&mut self) {
        self.state = CallState::Ringing;
    }

    pub fn answer(&mut self) {
        self.state = CallState::Answered;
    }

    /// Returns `true` only the first time ACK is observed in `Answered`
    /// state — that's when the caller should actually start the RTP
    /// session. Any later ACK (retransmission) is a no-op.
    pub fn observe_ack(&mut self) -> bool {
        if self.state == CallState::Answered && !self.established_once {
            self.state = CallState::Established;
            self.established_once = true;
            true
        } else {
            false
        }
    }

    pub fn begin_terminate(&mut self) {
        self.state = CallState::Terminating;
    }

    pub fn close(&mut self) {
        self.state = CallState::Closed;
    }
}
