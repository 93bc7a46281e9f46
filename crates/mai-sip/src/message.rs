//! Minimal SIP text-message parsing/building (spec §6 "SIP/RTP wire
//! formats"). Only the request/response shapes C12 actually needs: INVITE,
//! ACK, BYE, CANCEL, OPTIONS, and the matching status responses.

use std::fmt::Write as _;

use crate::error::SipError;

#[derive(Debug, Clone)]
pub struct SipMessage {
    pub start_line: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl SipMessage {
    pub fn parse(raw: &str) -> Result<Self, SipError> {
        let raw = raw.replace("\r\n", "\n");
        let mut parts = raw.splitn(2, "\n\n");
        let head = parts.next().ok_or_else(|| SipError::MalformedMessage("empty message".into()))?;
        let body = parts.next().unwrap_or("").to_string();

        let mut lines = head.lines();
        let start_line = lines.next().ok_or_else(|| SipError::MalformedMessage("missing start line".into()))?.to_string();

        let mut headers = Vec::new();
        for line in lines {
            let (name, value) =
                line.split_once(':').ok_or_else(|| SipError::MalformedMessage(format!("malformed header: {line}")))?;
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }

        Ok(Self { start_line, headers, body })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    /// The method of a request start line (`INVITE sip:... SIP/2.0`), or
    /// `None` for a status-line response.
    pub fn method(&self) -> Option<&str> {
        let first = self.start_line.split_whitespace().next()?;
        if first.eq_ignore_ascii_case("SIP/2.0") {
            None
        } else {
            Some(first)
        }
    }

    pub fn call_id(&self) -> Option<&str> {
        self.header("Call-ID")
    }

    /// `(sequence, method)` from the `CSeq` header.
    pub fn cseq(&self) -> Option<(u32, &str)> {
        let raw = self.header("CSeq")?;
        let (seq, method) = raw.split_once(' ')?;
        Some((seq.trim().parse().ok()?, method.trim()))
    }

    /// `tag=` parameter on the `From:` header.
    pub fn from_tag(&self) -> Option<&str> {
        tag_param(self.header("From")?)
    }
}

fn tag_param(header_value: &str) -> Option<&str> {
    header_value.split(';').find_map(|part| part.trim().strip_prefix("tag="))
}

/// Build a response to `request` with the given status line, always
/// carrying `Via`/`From`/`To`/`Call-ID`/`CSeq`/`Contact` (spec §6). `to_tag`
/// is attached to `To:` for 180/200 and onward; omitted (or re-sent as-is)
/// for 100 Trying.
#[allow(clippy::too_many_arguments)]
pub fn build_response(
    status_code: u16,
    reason: &str,
    request: &SipMessage,
    to_tag: Option<&str>,
    contact_uri: &str,
    body: Option<&str>,
) -> String {
    let mut out = format!("SIP/2.0 {status_code} {reason}\r\n");
    if let Some(via) = request.header("Via") {
        let _ = writeln!(out, "Via: {via}\r");
    }
    if let Some(from) = request.header("From") {
        let _ = writeln!(out, "From: {from}\r");
    }
    let to = request.header("To").unwrap_or("");
    match to_tag {
        Some(tag) if !to.contains("tag=") => {
            let _ = writeln!(out, "To: {to};tag={tag}\r");
        }
        _ => {
            let _ = writeln!(out, "To: {to}\r");
        }
    }
    if let Some(call_id) = request.call_id() {
        let _ = writeln!(out, "Call-ID: {call_id}\r");
    }
    if let Some((seq, method)) = request.cseq() {
        let _ = writeln!(out, "CSeq: {seq} {method}\r");
    }
    let _ = writeln!(out, "Contact: <{contact_uri}>\r");

    match body {
        Some(body) => {
            let _ = writeln!(out, "Content-Type: application/sdp\r");
            let _ = writeln!(out, "Content-Length: {}\r", body.len());
            let _ = write!(out, "\r\n{body}");
        }
        None => {
            let _ = writeln!(out, "Content-Length: 0\r");
            out.push_str("\r\n");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVITE: &str = "INVITE sip:bot@192.168.1.10 SIP/2.0\r\n\
Via: SIP/2.0/UDP 192.168.1.20:5060;branch=z9hG4bK776\r\n\
From: <sip:alice@192.168.1.20>;tag=a73kszlfl\r\n\
To: <sip:bot@192.168.1.10>\r\n\
Call-ID: a84b4c76e66710@192.168.1.20\r\n\
CSeq: 1 INVITE\r\n\
Content-Length: 0\r\n\
\r\n";

    #[test]
    fn parses_method_and_headers() {
        let msg = SipMessage::parse(INVITE).unwrap();
        assert_eq!(msg.method(), Some("INVITE"));
        assert_eq!(msg.call_id(), Some("a84b4c76e66710@192.168.1.20"));
        assert_eq!(msg.cseq(), Some((1, "INVITE")));
        assert_eq!(msg.from_tag(), Some("a73kszlfl"));
    }

    #[test]
    fn status_response_has_no_method() {
        let msg = SipMessage::parse("SIP/2.0 200 OK\r\nCall-ID: x\r\n\r\n").unwrap();
        assert_eq!(msg.method(), None);
    }

    #[test]
    fn build_response_adds_to_tag_once() {
        let request = SipMessage::parse(INVITE).unwrap();
        let resp = build_response(200, "OK", &request, Some("srv-tag-1"), "sip:bot@192.168.1.10:5060", None);
        assert!(resp.starts_with("SIP/2.0 200 OK"));
        assert!(resp.contains("To: <sip:bot@192.168.1.10>;tag=srv-tag-1"));
        assert!(resp.contains("Call-ID: a84b4c76e66710@192.168.1.20"));
        assert!(resp.contains("CSeq: 1 INVITE"));
    }

    #[test]
    fn build_response_with_body_sets_content_length() {
        let request = SipMessage::parse(INVITE).unwrap();
        let body = "v=0\r\no=- 0 0 IN IP4 1.2.3.4\r\n";
        let resp = build_response(200, "OK", &request, Some("t1"), "sip:bot@192.168.1.10:5060", Some(body));
        assert!(resp.contains(&format!("Content-Length: {}", body.len())));
        assert!(resp.ends_with(body));
    }
}
