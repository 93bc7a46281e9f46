//! Subject normalization for thread resolution (spec §4.13 step 4: "strip
//! any leading chain of `Re:`/`RE:`/`Fwd:`/`FW:` tokens").

const PREFIXES: &[&str] = &["re:", "fwd:", "fw:"];

/// Collapse a subject down to its normalized form so `"Re: Fwd: Travel
/// plans"` and `"Travel plans"` resolve to the same thread.
pub fn normalize_subject(subject: &str) -> String {
    let mut rest = subject.trim();
    loop {
        let lower = rest.to_lowercase();
        let stripped = PREFIXES.iter().find_map(|p| {
            if lower.starts_with(p) {
                Some(rest[p.len()..].trim_start())
            } else {
                None
            }
        });
        match stripped {
            Some(next) => rest = next,
            None => break,
        }
    }
    rest.to_lowercase()
}

/// `Re:` prefix for the reply subject, unless the thread subject already
/// has one (spec §4.13 "Reply send": "`Re:` prefix unless present").
pub fn reply_subject(original_subject: &str) -> String {
    if original_subject.to_lowercase().starts_with("re:") {
        original_subject.to_string()
    } else {
        format!("Re: {original_subject}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_single_re_prefix() {
        assert_eq!(normalize_subject("Re: Travel plans"), "travel plans");
    }

    #[test]
    fn strips_chained_prefixes_of_mixed_case() {
        assert_eq!(normalize_subject("RE: Fwd: FW: Travel plans"), "travel plans");
    }

    #[test]
    fn subject_without_prefix_is_unchanged_besides_case() {
        assert_eq!(normalize_subject("Travel plans"), "travel plans");
    }

    #[test]
    fn reply_subject_adds_re_once() {
        assert_eq!(reply_subject("Travel plans"), "Re: Travel plans");
        assert_eq!(reply_subject("Re: Travel plans"), "Re: Travel plans");
    }
}
