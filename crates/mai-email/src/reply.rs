//! Reply envelope assembly (spec §4.13 "Reply send"): threading headers
//! and a minimal plain/HTML body pair. Pure string assembly — the actual
//! MIME encoding and socket I/O live in `smtp.rs`.

use crate::thread::reply_subject;

/// Everything `smtp.rs` needs to compose and send one outbound reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyEnvelope {
    pub to: String,
    pub subject: String,
    pub in_reply_to: Option<String>,
    pub references: Vec<String>,
    pub plain_body: String,
    pub html_body: String,
}

/// Build the threaded reply envelope. `references` should already include
/// every prior `Message-ID` in the thread (RFC 5322 §3.6.4); this appends
/// the message being replied to if it isn't already the last entry.
pub fn build_reply(
    to: &str,
    original_subject: &str,
    in_reply_to_message_id: Option<&str>,
    mut references: Vec<String>,
    body_text: &str,
) -> ReplyEnvelope {
    if let Some(id) = in_reply_to_message_id {
        if references.last().map(String::as_str) != Some(id) {
            references.push(id.to_string());
        }
    }

    ReplyEnvelope {
        to: to.to_string(),
        subject: reply_subject(original_subject),
        in_reply_to: in_reply_to_message_id.map(str::to_string),
        references,
        plain_body: body_text.to_string(),
        html_body: plain_to_minimal_html(body_text),
    }
}

/// Minimal HTML alternative: paragraph per blank-line-separated block,
/// `<br>` for single newlines. No rich formatting — the spec calls for
/// "minimal HTML", not a styled template.
fn plain_to_minimal_html(text: &str) -> String {
    let paragraphs: Vec<String> = text
        .split("\n\n")
        .map(|block| format!("<p>{}</p>", html_escape(block).replace('\n', "<br>")))
        .collect();
    paragraphs.join("\n")
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_re_prefix_and_threading_headers() {
        let envelope = build_reply("alice@example.com", "Travel plans", Some("<1@mail>"), vec![], "Added your flight.");
        assert_eq!(envelope.subject, "Re: Travel plans");
        assert_eq!(envelope.in_reply_to.as_deref(), Some("<1@mail>"));
        assert_eq!(envelope.references, vec!["<1@mail>".to_string()]);
    }

    #[test]
    fn does_not_duplicate_reference_already_last() {
        let envelope = build_reply("a@b.com", "hi", Some("<2@mail>"), vec!["<1@mail>".into(), "<2@mail>".into()], "ok");
        assert_eq!(envelope.references, vec!["<1@mail>".to_string(), "<2@mail>".to_string()]);
    }

    #[test]
    fn html_body_escapes_and_wraps_paragraphs() {
        let envelope = build_reply("a@b.com", "hi", None, vec![], "Line one <3\n\nLine two");
        assert!(envelope.html_body.contains("&lt;3"));
        assert!(envelope.html_body.contains("<p>"));
    }
}
