//! SDP offer parsing and answer construction (spec §4.12 "parse SDP for
//! `c=` address and `m=audio` port" / §6 "SDP offered").

use crate::error::SipError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdpOffer {
    pub remote_address: String,
    pub remote_port: u16,
}

pub fn parse_offer(body: &str) -> Result<SdpOffer, SipError> {
    let remote_address = body
        .lines()
        .find_map(|line| line.strip_prefix("c=IN IP4 "))
        .map(|s| s.trim().to_string())
        .ok_or_else(|| SipError::MalformedSdp("missing c=IN IP4 line".into()))?;

    let remote_port = body
        .lines()
        .find_map(|line| line.strip_prefix("m=audio "))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|port| port.parse().ok())
        .ok_or_else(|| SipError::MalformedSdp("missing or malformed m=audio line".into()))?;

    Ok(SdpOffer { remote_address, remote_port })
}

/// Build the answer SDP advertised in 200 OK (spec §6): PCMU/PCMA/telephone-event,
/// `ptime:20`, `sendrecv`.
pub fn build_answer(local_address: &str, local_port: u16) -> String {
    format!(
        "v=0\r\n\
         o=- 0 0 IN IP4 {local_address}\r\n\
         s=mai\r\n\
         c=IN IP4 {local_address}\r\n\
         t=0 0\r\n\
         m=audio {local_port} RTP/AVP 0 8 101\r\n\
         a=rtpmap:0 PCMU/8000\r\n\
         a=rtpmap:8 PCMA/8000\r\n\
         a=rtpmap:101 telephone-event/8000\r\n\
         a=ptime:20\r\n\
         a=sendrecv\r\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFER: &str = "v=0\r\n\
o=- 123 123 IN IP4 192.168.1.20\r\n\
s=-\r\n\
c=IN IP4 192.168.1.20\r\n\
t=0 0\r\n\
m=audio 5004 RTP/AVP 0 8\r\n";

    #[test]
    fn parses_connection_address_and_port() {
        let offer = parse_offer(OFFER).unwrap();
        assert_eq!(offer.remote_address, "192.168.1.20");
        assert_eq!(offer.remote_port, 5004);
    }

    #[test]
    fn missing_media_line_is_an_error() {
        assert!(parse_offer("v=0\r\nc=IN IP4 1.2.3.4\r\n").is_err());
    }

    #[test]
    fn answer_advertises_all_three_payload_types() {
        let answer = build_answer("10.0.0.5", 6000);
        assert!(answer.contains("m=audio 6000 RTP/AVP 0 8 101"));
        assert!(answer.contains("a=rtpmap:0 PCMU/8000"));
        assert!(answer.contains("a=rtpmap:101 telephone-event/8000"));
        assert!(answer.contains("a=ptime:20"));
        assert!(answer.contains("a=sendrecv"));
    }
}
