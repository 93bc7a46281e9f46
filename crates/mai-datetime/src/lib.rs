//! Deterministic natural-language date expression parser (spec §4.4, C4).
//!
//! `parse` is a pure function of `(expression, reference)` — no wall-clock
//! reads, no locale state — so it is trivially property-testable and the
//! round-trip invariant in spec §8 (`parse(format_iso(parse(e, r)), r) ==
//! parse(e, r)`) holds by construction once an expression resolves to a
//! concrete date.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

const WEEKDAYS: [(&str, Weekday); 7] = [
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

const MONTHS: [(&str, u32); 12] = [
    ("january", 1), ("jan", 1),
    ("february", 2), ("feb", 2),
    ("march", 3), ("mar", 3),
    ("april", 4), ("apr", 4),
    ("may", 5),
    ("june", 6), ("jun", 6),
    ("july", 7), ("jul", 7),
    ("august", 8), ("aug", 8),
    ("september", 9), ("sep", 9), ("sept", 9),
    ("october", 10), ("oct", 10),
    ("november", 11), ("nov", 11),
    ("december", 12), ("dec", 12),
];

/// Parse a natural-language date expression relative to `reference`.
///
/// Returns `None` when the expression cannot be confidently resolved —
/// callers (spec §4.5) must discard the extraction rather than guess.
pub fn parse(expression: &str, reference: NaiveDate) -> Option<NaiveDate> {
    let expr = expression.trim().to_lowercase();
    if expr.is_empty() || expr == "null" {
        return None;
    }

    // Two dates joined by "and" or "," — take the first.
    if let Some(first) = split_first_of_pair(&expr) {
        return parse(&first, reference);
    }

    if let Some(d) = parse_iso(&expr) {
        return Some(d);
    }
    if expr == "today" {
        return Some(reference);
    }
    if expr == "tomorrow" {
        return Some(reference + Duration::days(1));
    }
    if let Some(d) = parse_in_n_units(&expr, reference) {
        return Some(d);
    }
    if let Some(d) = parse_weekday(&expr, reference) {
        return Some(d);
    }
    if let Some(d) = parse_month_day(&expr, reference) {
        return Some(d);
    }
    parse_fallback(&expr, reference)
}

/// ISO `YYYY-MM-DD` literal.
fn parse_iso(expr: &str) -> Option<NaiveDate> {
    if expr.len() == 10 && expr.as_bytes()[4] == b'-' && expr.as_bytes()[7] == b'-' {
        NaiveDate::parse_from_str(expr, "%Y-%m-%d").ok()
    } else {
        None
    }
}

/// `in N (day|week|month)s?` — month is treated as 30 days (spec §4.4).
fn parse_in_n_units(expr: &str, reference: NaiveDate) -> Option<NaiveDate> {
    let rest = expr.strip_prefix("in ")?;
    let mut parts = rest.split_whitespace();
    let count: i64 = parts.next()?.parse().ok()?;
    let unit = parts.next()?;
    let unit = unit.trim_end_matches('s');
    let days = match unit {
        "day" => count,
        "week" => count * 7,
        "month" => count * 30,
        _ => return None,
    };
    Some(reference + Duration::days(days))
}

/// `{this|next}? <weekday>` per the spec §4.4 table:
/// - `this <weekday>`: next occurrence in this week (same-day → +7)
/// - `next <weekday>`: one week later than the above
/// - bare `<weekday>`: next occurrence (same-day → +7) — same rule as `this`
fn parse_weekday(expr: &str, reference: NaiveDate) -> Option<NaiveDate> {
    let (prefix, rest) = if let Some(r) = expr.strip_prefix("next ") {
        (Some("next"), r)
    } else if let Some(r) = expr.strip_prefix("this ") {
        (Some("this"), r)
    } else {
        (None, expr)
    };
    let rest = rest.trim();

    let (_, target) = WEEKDAYS.iter().find(|(name, _)| *name == rest)?;
    let current = reference.weekday();
    let mut days_ahead = (target.num_days_from_monday() as i64
        - current.num_days_from_monday() as i64)
        .rem_euclid(7);
    if days_ahead == 0 {
        days_ahead = 7;
    }
    if prefix == Some("next") {
        days_ahead += 7;
    }
    Some(reference + Duration::days(days_ahead))
}

/// `<month> <day>(st|nd|rd|th)?`, including a `<month> D-D` range (take start).
/// Uses the reference year; rolls to next year if the resulting date has
/// already passed.
fn parse_month_day(expr: &str, reference: NaiveDate) -> Option<NaiveDate> {
    let cleaned: String = expr
        .chars()
        .map(|c| if c == ',' { ' ' } else { c })
        .collect();
    let mut tokens = cleaned.split_whitespace();
    let month_tok = tokens.next()?;
    let month = MONTHS.iter().find(|(name, _)| *name == month_tok)?.1;

    let day_tok = tokens.next()?;
    // Range form "D-D" — take the start.
    let day_tok = day_tok.split('-').next()?;
    let day_digits: String = day_tok.chars().take_while(|c| c.is_ascii_digit()).collect();
    let day: u32 = day_digits.parse().ok()?;

    let mut year = reference.year();
    let mut candidate = NaiveDate::from_ymd_opt(year, month, day)?;
    if candidate < reference {
        year += 1;
        candidate = NaiveDate::from_ymd_opt(year, month, day)?;
    }
    Some(candidate)
}

/// Split on " and " or a top-level comma, returning the first segment only
/// when both segments look like plausible date fragments (avoids treating
/// "meeting, 3pm" as two dates).
fn split_first_of_pair(expr: &str) -> Option<String> {
    if let Some(idx) = expr.find(" and ") {
        let (first, second) = expr.split_at(idx);
        let second = second.trim_start_matches(" and ").trim();
        if looks_like_date_fragment(first.trim()) && looks_like_date_fragment(second) {
            return Some(first.trim().to_string());
        }
    }
    if let Some(idx) = expr.find(',') {
        let (first, second) = expr.split_at(idx);
        let second = second.trim_start_matches(',').trim();
        if looks_like_date_fragment(first.trim())
            && looks_like_date_fragment(second)
            && parse_iso(first.trim()).is_none()
        {
            return Some(first.trim().to_string());
        }
    }
    None
}

fn looks_like_date_fragment(s: &str) -> bool {
    !s.is_empty()
        && (s.chars().next().unwrap().is_ascii_digit()
            || MONTHS.iter().any(|(name, _)| s.starts_with(name))
            || WEEKDAYS.iter().any(|(name, _)| s.contains(name))
            || s == "today"
            || s == "tomorrow")
}

/// Best-effort fallback for a handful of common numeric formats
/// (`M/D/YYYY`, `M/D`). Anything else is unparseable — return `None`
/// rather than guess (spec §4.4 Fallback row, §8 soundness invariant).
fn parse_fallback(expr: &str, reference: NaiveDate) -> Option<NaiveDate> {
    let parts: Vec<&str> = expr.split('/').collect();
    match parts.as_slice() {
        [m, d, y] => {
            let month: u32 = m.parse().ok()?;
            let day: u32 = d.parse().ok()?;
            let year: i32 = if y.len() == 2 {
                2000 + y.parse::<i32>().ok()?
            } else {
                y.parse().ok()?
            };
            NaiveDate::from_ymd_opt(year, month, day)
        }
        [m, d] => {
            let month: u32 = m.parse().ok()?;
            let day: u32 = d.parse().ok()?;
            let mut year = reference.year();
            let mut candidate = NaiveDate::from_ymd_opt(year, month, day)?;
            if candidate < reference {
                year += 1;
                candidate = NaiveDate::from_ymd_opt(year, month, day)?;
            }
            Some(candidate)
        }
        _ => None,
    }
}

/// Canonical ISO rendering, used by the round-trip property in spec §8.
pub fn format_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ref_date() -> NaiveDate {
        // Wednesday, spec §8 scenario 1's reference date.
        NaiveDate::from_ymd_opt(2025, 10, 15).unwrap()
    }

    #[test]
    fn scenario_next_friday() {
        let d = parse("next friday", ref_date()).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2025, 10, 24).unwrap());
    }

    #[test]
    fn this_friday_is_this_week() {
        let d = parse("this friday", ref_date()).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2025, 10, 17).unwrap());
    }

    #[test]
    fn bare_friday_matches_this_friday() {
        let d = parse("friday", ref_date()).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2025, 10, 17).unwrap());
    }

    #[test]
    fn same_day_bare_weekday_rolls_a_week() {
        // reference itself is a Wednesday.
        let d = parse("wednesday", ref_date()).unwrap();
        assert_eq!(d, ref_date() + Duration::days(7));
    }

    #[test]
    fn today_and_tomorrow() {
        assert_eq!(parse("today", ref_date()).unwrap(), ref_date());
        assert_eq!(parse("tomorrow", ref_date()).unwrap(), ref_date() + Duration::days(1));
    }

    #[test]
    fn in_n_units() {
        assert_eq!(parse("in 3 days", ref_date()).unwrap(), ref_date() + Duration::days(3));
        assert_eq!(parse("in 2 weeks", ref_date()).unwrap(), ref_date() + Duration::days(14));
        assert_eq!(parse("in 1 month", ref_date()).unwrap(), ref_date() + Duration::days(30));
    }

    #[test]
    fn month_day_rolls_to_next_year_if_past() {
        // Reference is Oct 15 2025; "March 1st" has already passed this year.
        let d = parse("march 1st", ref_date()).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
    }

    #[test]
    fn month_day_future_this_year() {
        let d = parse("november 5", ref_date()).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2025, 11, 5).unwrap());
    }

    #[test]
    fn range_takes_start() {
        let d = parse("november 5-7", ref_date()).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2025, 11, 5).unwrap());
    }

    #[test]
    fn pair_takes_first() {
        let d = parse("november 5 and november 7", ref_date()).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2025, 11, 5).unwrap());
    }

    #[test]
    fn iso_literal() {
        assert_eq!(parse("2025-12-25", ref_date()).unwrap(), NaiveDate::from_ymd_opt(2025, 12, 25).unwrap());
    }

    #[test]
    fn unparseable_returns_none() {
        assert!(parse("whenever I feel like it", ref_date()).is_none());
    }

    #[test]
    fn round_trip_is_stable() {
        let d1 = parse("next friday", ref_date());
        let d2 = parse(&format_iso(d1.unwrap()), ref_date());
        assert_eq!(d1, d2);
    }

    #[test]
    fn deterministic_same_inputs_same_output() {
        let a = parse("in 5 days", ref_date());
        let b = parse("in 5 days", ref_date());
        assert_eq!(a, b);
    }
}
