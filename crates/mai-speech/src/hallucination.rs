//! Whisper's known hallucination phrases (spec §4.12 per-turn flow: "drop
//! known Whisper hallucinations"). These are the filler transcripts the
//! model tends to emit when fed near-silence — shared by every voice
//! channel so the list is maintained in one place.

const KNOWN_HALLUCINATIONS: &[&str] = &["thank you", "bye", "you", "thank you for watching"];

/// True if `transcript` is (after trimming punctuation/case) one of
/// Whisper's known hallucination-on-silence phrases.
pub fn is_known_hallucination(transcript: &str) -> bool {
    let normalized = transcript.trim().trim_end_matches(['.', '!', '?']).trim().to_lowercase();
    KNOWN_HALLUCINATIONS.contains(&normalized.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_matches_are_dropped() {
        assert!(is_known_hallucination("Thank you."));
        assert!(is_known_hallucination("bye"));
        assert!(is_known_hallucination("You"));
        assert!(is_known_hallucination("thank you for watching"));
    }

    #[test]
    fn real_speech_is_not_dropped() {
        assert!(!is_known_hallucination("can you remind me about my dentist appointment"));
    }

    #[test]
    fn thank_you_embedded_in_a_longer_sentence_is_not_dropped() {
        assert!(!is_known_hallucination("thank you so much for helping me with that"));
    }
}
