//! Inbound RFC822 parsing (spec §4.13 step 1: "Parse sender, subject,
//! Message-ID, References, plain/HTML body, attachments").

use mail_parser::{MessageParser, MimeHeaders};

use crate::error::EmailError;

pub struct ParsedEmail {
    pub from_address: String,
    pub subject: String,
    pub message_id: Option<String>,
    pub references: Vec<String>,
    pub body_text: String,
    pub attachments: Vec<ParsedAttachment>,
}

pub struct ParsedAttachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

pub fn parse(raw: &[u8]) -> Result<ParsedEmail, EmailError> {
    let message = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| EmailError::MalformedMessage("could not parse RFC822 message".into()))?;

    let from_address = message
        .from()
        .and_then(|f| f.first())
        .and_then(|addr| addr.address())
        .map(|s| s.to_lowercase())
        .ok_or_else(|| EmailError::MalformedMessage("message has no From address".into()))?;

    let subject = message.subject().unwrap_or("(no subject)").to_string();
    let message_id = message.message_id().map(|s| format!("<{s}>"));
    let references = message
        .references()
        .and_then(|r| r.as_text_list())
        .map(|ids| ids.into_iter().map(|id| format!("<{id}>")).collect())
        .unwrap_or_default();

    let body_text = message
        .body_text(0)
        .map(|s| s.to_string())
        .or_else(|| message.body_html(0).map(|html| strip_tags(&html)))
        .unwrap_or_default();

    let mut attachments = Vec::new();
    for attachment in message.attachments() {
        let filename = attachment.attachment_name().unwrap_or("unnamed").to_string();
        let content_type = attachment
            .content_type()
            .map(|ct| match ct.subtype() {
                Some(sub) => format!("{}/{}", ct.ctype(), sub),
                None => ct.ctype().to_string(),
            })
            .unwrap_or_else(|| "application/octet-stream".to_string());
        attachments.push(ParsedAttachment { filename, content_type, bytes: attachment.contents().to_vec() });
    }

    Ok(ParsedEmail { from_address, subject, message_id, references, body_text, attachments })
}

fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = b"From: Alice <alice@example.com>\r\n\
Subject: Travel plans\r\n\
Message-ID: <abc@example.com>\r\n\
Content-Type: text/plain\r\n\
\r\n\
Please add my flight.\r\n";

    #[test]
    fn parses_sender_subject_and_body() {
        let parsed = parse(SAMPLE).unwrap();
        assert_eq!(parsed.from_address, "alice@example.com");
        assert_eq!(parsed.subject, "Travel plans");
        assert_eq!(parsed.message_id.as_deref(), Some("<abc@example.com>"));
        assert!(parsed.body_text.contains("Please add my flight."));
        assert!(parsed.attachments.is_empty());
    }

    #[test]
    fn strip_tags_removes_markup_only() {
        assert_eq!(strip_tags("<p>Hello <b>world</b></p>"), "Hello world");
    }
}
