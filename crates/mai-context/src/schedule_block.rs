//! Schedule-block assembly (spec §4.6 step 4): the full always-on voice
//! view, and the narrower conditional view used by text/e-mail.

use chrono::{Datelike, Duration, NaiveDate};
use mai_memory::ScheduleEvent;

const SCHEDULE_INTENT_KEYWORDS: &[&str] = &[
    "schedule", "calendar", "event", "appointment", "meeting", "plan", "agenda",
    "when is", "when's", "what's on", "whats on", "free time", "busy", "reminder",
];

const CATEGORY_TRAVEL: &[&str] = &["flight", "trip", "travel", "vacation", "hotel", "airport"];
const CATEGORY_APPOINTMENT: &[&str] = &["appointment", "doctor", "dentist", "checkup", "clinic"];
const CATEGORY_MEETING: &[&str] = &["meeting", "call", "sync", "conference", "standup"];
const CATEGORY_EVENT: &[&str] = &["event", "party", "concert", "birthday", "celebration"];

const WEEKDAY_NAMES: [&str; 7] =
    ["monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday"];

const MONTH_NAMES: [&str; 12] = [
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];

/// True when the turn contains a term suggesting the user cares about their
/// schedule right now — gates whether the conditional block appears at all
/// (spec §4.6 step 4, text/e-mail paths).
pub fn wants_schedule_block(turn: &str) -> bool {
    let lower = turn.to_lowercase();
    SCHEDULE_INTENT_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// "when is my X" / "when's my X" → the bare target, so the caller can
/// delegate to C9 search (`mai_scheduler::search`) instead of a raw listing.
pub fn when_is_my_query(turn: &str) -> Option<String> {
    let lower = turn.to_lowercase();
    for prefix in ["when is my ", "when's my ", "when is the ", "when's the "] {
        if let Some(rest) = lower.strip_prefix(prefix) {
            let target = rest.trim_end_matches(['?', '.', '!']).trim();
            if !target.is_empty() {
                return Some(target.to_string());
            }
        }
    }
    None
}

/// One of the spec's named keyword categories (travel/appointment/meeting/
/// event), used to narrow the conditional schedule listing to events whose
/// title/description mentions the same category (spec §4.6 step 4).
pub fn category_filter(turn: &str) -> Option<&'static [&'static str]> {
    let lower = turn.to_lowercase();
    if CATEGORY_TRAVEL.iter().any(|k| lower.contains(k)) {
        Some(CATEGORY_TRAVEL)
    } else if CATEGORY_APPOINTMENT.iter().any(|k| lower.contains(k)) {
        Some(CATEGORY_APPOINTMENT)
    } else if CATEGORY_MEETING.iter().any(|k| lower.contains(k)) {
        Some(CATEGORY_MEETING)
    } else if CATEGORY_EVENT.iter().any(|k| lower.contains(k)) {
        Some(CATEGORY_EVENT)
    } else {
        None
    }
}

pub fn event_matches_category(event: &ScheduleEvent, keywords: &[&str]) -> bool {
    let haystack = format!(
        "{} {}",
        event.title.to_lowercase(),
        event.description.as_deref().unwrap_or("").to_lowercase()
    );
    keywords.iter().any(|k| haystack.contains(k))
}

/// Month/quarter filter (spec §4.6 step 4): "this month", "next month",
/// "this quarter", or a bare month name mentioned in the turn.
pub fn month_filter(turn: &str, reference: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let lower = turn.to_lowercase();
    if lower.contains("this month") {
        return Some(month_bounds(reference.year(), reference.month()));
    }
    if lower.contains("next month") {
        let (y, m) = next_month(reference.year(), reference.month());
        return Some(month_bounds(y, m));
    }
    if lower.contains("this quarter") {
        let quarter_start_month = ((reference.month0() / 3) * 3) + 1;
        let start = NaiveDate::from_ymd_opt(reference.year(), quarter_start_month, 1)?;
        let (end_y, end_m) = next_month(
            start.year(),
            (quarter_start_month + 2 - 1) % 12 + 1,
        );
        let end = NaiveDate::from_ymd_opt(end_y, end_m, 1)? - Duration::days(1);
        return Some((start, end));
    }
    for (idx, name) in MONTH_NAMES.iter().enumerate() {
        if lower.contains(name) {
            let month = idx as u32 + 1;
            let mut year = reference.year();
            if month < reference.month() {
                year += 1;
            }
            return Some(month_bounds(year, month));
        }
    }
    None
}

fn month_bounds(year: i32, month: u32) -> (NaiveDate, NaiveDate) {
    let start = NaiveDate::from_ymd_opt(year, month, 1).expect("valid month");
    let (ny, nm) = next_month(year, month);
    let end = NaiveDate::from_ymd_opt(ny, nm, 1).expect("valid month") - Duration::days(1);
    (start, end)
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

/// Time-window filter (spec §4.6 step 4): today/tomorrow/this week/a named
/// weekday mentioned in the turn.
pub fn time_window_filter(turn: &str, reference: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let lower = turn.to_lowercase();
    if lower.contains("today") {
        return Some((reference, reference));
    }
    if lower.contains("tomorrow") {
        let d = reference + Duration::days(1);
        return Some((d, d));
    }
    if lower.contains("this week") {
        return Some((reference, end_of_week(reference)));
    }
    for (idx, name) in WEEKDAY_NAMES.iter().enumerate() {
        if lower.contains(name) {
            let target = weekday_from_index(idx);
            let current = reference.weekday();
            let mut days_ahead =
                (target.num_days_from_monday() as i64 - current.num_days_from_monday() as i64).rem_euclid(7);
            if days_ahead == 0 {
                days_ahead = 7;
            }
            let d = reference + Duration::days(days_ahead);
            return Some((d, d));
        }
    }
    None
}

fn weekday_from_index(idx: usize) -> chrono::Weekday {
    use chrono::Weekday::*;
    match idx {
        0 => Mon,
        1 => Tue,
        2 => Wed,
        3 => Thu,
        4 => Fri,
        5 => Sat,
        _ => Sun,
    }
}

fn end_of_week(reference: NaiveDate) -> NaiveDate {
    let days_left = 6 - reference.weekday().num_days_from_monday() as i64;
    reference + Duration::days(days_left)
}

/// Voice channel's always-on view (spec §4.6 step 4): grouped by
/// today/tomorrow/this week/later, importance-coded, rendered explicitly
/// even when empty with a "do not invent events" reinforcement.
pub fn format_grouped_view(events: &[ScheduleEvent], reference: NaiveDate) -> String {
    if events.is_empty() {
        return "Upcoming schedule (next 30 days): nothing scheduled. Do not invent events \
                that are not listed here."
            .to_string();
    }

    let tomorrow = reference + Duration::days(1);
    let week_end = end_of_week(reference);

    let mut today_lines = Vec::new();
    let mut tomorrow_lines = Vec::new();
    let mut week_lines = Vec::new();
    let mut later_lines = Vec::new();

    for event in events {
        let line = format_event_line(event);
        if event.event_date == reference {
            today_lines.push(line);
        } else if event.event_date == tomorrow {
            tomorrow_lines.push(line);
        } else if event.event_date <= week_end {
            week_lines.push(line);
        } else {
            later_lines.push(line);
        }
    }

    let mut out = String::from("Upcoming schedule (next 30 days):\n");
    push_group(&mut out, "Today", &today_lines);
    push_group(&mut out, "Tomorrow", &tomorrow_lines);
    push_group(&mut out, "This week", &week_lines);
    push_group(&mut out, "Later", &later_lines);
    out.push_str("Do not invent events that are not listed here.");
    out
}

/// Conditional path's narrower listing (spec §4.6 step 4): a flat list,
/// already pre-filtered by category/month/time-window before this is called.
pub fn format_flat_view(events: &[ScheduleEvent]) -> String {
    if events.is_empty() {
        return "No matching events found. Do not invent events that are not listed here.".to_string();
    }
    let mut out = String::from("Relevant schedule:\n");
    for event in events {
        out.push_str(&format_event_line(event));
        out.push('\n');
    }
    out.push_str("Do not invent events that are not listed here.");
    out
}

fn push_group(out: &mut String, label: &str, lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    out.push_str(label);
    out.push_str(":\n");
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
}

fn format_event_line(event: &ScheduleEvent) -> String {
    let time = event.event_time.map(|t| t.format("%H:%M").to_string()).unwrap_or_else(|| "all day".to_string());
    let tag = if event.importance >= 8 {
        "[high importance] "
    } else if event.importance <= 3 {
        "[low importance] "
    } else {
        ""
    };
    format!("- {} {} {}{}", event.event_date, time, tag, event.title)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ref_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 15).unwrap()
    }

    #[test]
    fn empty_view_states_nothing_scheduled() {
        let out = format_grouped_view(&[], ref_date());
        assert!(out.contains("nothing scheduled"));
        assert!(out.contains("do not invent"));
    }

    #[test]
    fn when_is_my_extracts_target() {
        assert_eq!(when_is_my_query("When is my dentist appointment?").as_deref(), Some("dentist appointment"));
        assert_eq!(when_is_my_query("What's the weather"), None);
    }

    #[test]
    fn category_filter_detects_travel() {
        let keywords = category_filter("do I have any flight booked").unwrap();
        assert_eq!(keywords, CATEGORY_TRAVEL);
    }

    #[test]
    fn month_filter_this_month() {
        let (start, end) = month_filter("what's on this month", ref_date()).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 10, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 10, 31).unwrap());
    }

    #[test]
    fn month_filter_named_month_rolls_to_next_year_if_past() {
        let (start, _) = month_filter("anything in march", ref_date()).unwrap();
        assert_eq!(start.year(), 2026);
        assert_eq!(start.month(), 3);
    }

    #[test]
    fn time_window_today_and_tomorrow() {
        assert_eq!(time_window_filter("what's today", ref_date()), Some((ref_date(), ref_date())));
        let tomorrow = ref_date() + Duration::days(1);
        assert_eq!(time_window_filter("tomorrow's plan", ref_date()), Some((tomorrow, tomorrow)));
    }

    #[test]
    fn wants_schedule_block_requires_keyword() {
        assert!(wants_schedule_block("what's on my calendar"));
        assert!(!wants_schedule_block("how are you doing today"));
    }
}
