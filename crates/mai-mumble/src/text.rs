//! Text-message filtering (spec §4.11: "drop server notices (HTML-tagged
//! system lines, 'upgrade to Mumble', etc.); otherwise run through C7").
//!
//! Mumble's text channel carries both real user chat and the server's own
//! HTML-formatted notices (client version nags, channel join/leave
//! announcements). Only the former should ever reach the dialog pipeline.

const NOTICE_PHRASES: &[&str] = &[
    "upgrade to mumble",
    "please update your client",
    "has joined the channel",
    "has left the channel",
    "connected to the server",
];

/// True if `text` looks like a server-generated notice rather than
/// something a user typed.
pub fn is_server_notice(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return true;
    }
    if looks_like_html(trimmed) {
        return true;
    }
    let lower = trimmed.to_lowercase();
    NOTICE_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

fn looks_like_html(text: &str) -> bool {
    text.starts_with('<') && text.ends_with('>') && text.contains("</")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_user_text_is_not_a_notice() {
        assert!(!is_server_notice("hey, what's the weather like"));
    }

    #[test]
    fn html_wrapped_line_is_a_notice() {
        assert!(is_server_notice("<b>Alice</b> has joined the channel <i>Root</i>"));
    }

    #[test]
    fn version_nag_is_a_notice() {
        assert!(is_server_notice("Please upgrade to Mumble 1.5 for the best experience"));
    }

    #[test]
    fn empty_text_is_treated_as_a_notice() {
        assert!(is_server_notice("   "));
    }

    #[test]
    fn angle_bracket_without_closing_tag_is_not_html() {
        assert!(!is_server_notice("<laughs> that's hilarious"));
    }
}
