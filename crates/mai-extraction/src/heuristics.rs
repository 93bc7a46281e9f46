//! Pre-flight keyword heuristics (spec §4.5): decide without an LLM call
//! whether a turn is a pure schedule query (never extracted as a new
//! memory, never turned into an ADD/UPDATE/DELETE) and, after the LLM
//! answers, whether its claimed action is actually consistent with the
//! words the user used.

const QUERY_PATTERNS: &[&str] = &[
    "what's on my",
    "whats on my",
    "what is on my",
    "do i have",
    "tell me my calendar",
    "tell me about my calendar",
    "what do i have",
    "check my schedule",
    "check my calendar",
    "anything on my",
    "anything scheduled",
];

const ADD_KEYWORDS: &[&str] =
    &["schedule", "add", "book", "set", "remind", "appointment", "meeting", "plan", "create"];
const UPDATE_KEYWORDS: &[&str] = &["change", "move", "update", "reschedule", "push", "shift"];
const DELETE_KEYWORDS: &[&str] = &["cancel", "delete", "remove", "clear"];

const ACKNOWLEDGMENTS: &[&str] = &["ok", "okay", "thanks", "thank you", "sure", "got it", "alright", "yep", "yes"];

/// True when the turn is a read-only schedule question — extraction must
/// not run at all (neither memory nor schedule).
pub fn is_schedule_query(turn: &str) -> bool {
    let lower = turn.to_lowercase();
    QUERY_PATTERNS.iter().any(|p| lower.contains(p))
}

/// True when the turn is a bare acknowledgment not worth extracting from.
pub fn is_trivial_acknowledgment(turn: &str) -> bool {
    let trimmed = turn.trim().trim_end_matches(['.', '!']).to_lowercase();
    ACKNOWLEDGMENTS.contains(&trimmed.as_str())
}

/// True when the turn contains at least one keyword consistent with the
/// given schedule action (spec §4.5 "verify the action is consistent with
/// keywords in the turn").
pub fn action_keywords_present(turn: &str, action: super::types::ScheduleAction) -> bool {
    use super::types::ScheduleAction::*;
    let lower = turn.to_lowercase();
    match action {
        Add => ADD_KEYWORDS.iter().any(|k| lower.contains(k)),
        Update => UPDATE_KEYWORDS.iter().any(|k| lower.contains(k)),
        Delete => DELETE_KEYWORDS.iter().any(|k| lower.contains(k)),
        Nothing => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScheduleAction;

    #[test]
    fn recognizes_schedule_queries() {
        assert!(is_schedule_query("What's on my schedule today?"));
        assert!(is_schedule_query("Do I have anything tomorrow?"));
        assert!(!is_schedule_query("I have a dentist appointment tomorrow at 3pm"));
    }

    #[test]
    fn recognizes_acknowledgments() {
        assert!(is_trivial_acknowledgment("Thanks!"));
        assert!(is_trivial_acknowledgment("ok"));
        assert!(!is_trivial_acknowledgment("Thanks for booking the dentist"));
    }

    #[test]
    fn add_keywords_match() {
        assert!(action_keywords_present("Please schedule a meeting tomorrow", ScheduleAction::Add));
        assert!(!action_keywords_present("What a nice day", ScheduleAction::Add));
    }

    #[test]
    fn delete_keywords_match() {
        assert!(action_keywords_present("Cancel my dentist appointment", ScheduleAction::Delete));
        assert!(!action_keywords_present("Book a dentist appointment", ScheduleAction::Delete));
    }

    #[test]
    fn nothing_action_always_consistent() {
        assert!(action_keywords_present("anything at all", ScheduleAction::Nothing));
    }
}
