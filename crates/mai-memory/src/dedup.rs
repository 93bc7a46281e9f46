//! Word-overlap similarity used by the dedup rules in spec §4.3.

use std::collections::HashSet;

/// Jaccard similarity of the whitespace-tokenized, lowercased word sets of
/// `a` and `b`. Two empty strings are defined as similarity 0 (nothing to
/// compare), matching the "no evidence of duplication" reading of dedup.
pub fn jaccard_word_overlap(a: &str, b: &str) -> f64 {
    let lower_a = a.to_lowercase();
    let lower_b = b.to_lowercase();
    let set_a: HashSet<&str> = lower_a.split_whitespace().collect();
    let set_b: HashSet<&str> = lower_b.split_whitespace().collect();
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Threshold above which two non-schedule/±3-day-window schedule memories
/// are considered the same fact (spec §4.3 dedup rule).
pub const MEMORY_DEDUP_JACCARD_THRESHOLD: f64 = 0.6;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_overlap_fully() {
        assert_eq!(jaccard_word_overlap("doctor appointment tuesday", "doctor appointment tuesday"), 1.0);
    }

    #[test]
    fn disjoint_strings_have_no_overlap() {
        assert_eq!(jaccard_word_overlap("doctor appointment", "grocery shopping"), 0.0);
    }

    #[test]
    fn partial_overlap_crosses_threshold() {
        let score = jaccard_word_overlap(
            "doctor appointment next tuesday at 2pm",
            "doctor appointment tomorrow at 2pm",
        );
        assert!(score > MEMORY_DEDUP_JACCARD_THRESHOLD, "score was {score}");
    }

    #[test]
    fn overlap_is_case_insensitive() {
        assert_eq!(jaccard_word_overlap("Doctor Appointment", "doctor appointment"), 1.0);
    }

    #[test]
    fn empty_strings_never_match() {
        assert_eq!(jaccard_word_overlap("", "anything"), 0.0);
        assert_eq!(jaccard_word_overlap("", ""), 0.0);
    }
}
