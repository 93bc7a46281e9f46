//! Display-timezone formatting helpers.
//!
//! All timestamps are stored in UTC (spec §3); only presentation to a user
//! (context blocks, e-mail bodies, reminder text) converts to the
//! configured display timezone, default `America/New_York`.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

pub const DEFAULT_DISPLAY_TIMEZONE: &str = "America/New_York";

/// Resolve a configured timezone name, falling back to the default on
/// an unrecognized IANA name rather than panicking or failing the turn.
pub fn resolve_tz(name: &str) -> Tz {
    name.parse().unwrap_or_else(|_| {
        DEFAULT_DISPLAY_TIMEZONE
            .parse()
            .expect("default timezone name is valid")
    })
}

/// Render a UTC instant in the given display timezone as `YYYY-MM-DD HH:MM`.
pub fn format_local(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string()
}

/// Render just the date portion in the given display timezone.
pub fn format_local_date(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%Y-%m-%d").to_string()
}

/// Human-readable "Wednesday, October 15, 2025" form used in the context
/// builder's "current date" section (spec §4.6 step 2).
pub fn format_long_date(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%A, %B %-d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn unknown_tz_falls_back_to_default() {
        let tz = resolve_tz("Not/A_Timezone");
        assert_eq!(tz, resolve_tz(DEFAULT_DISPLAY_TIMEZONE));
    }

    #[test]
    fn formats_long_date() {
        let at = Utc.with_ymd_and_hms(2025, 10, 15, 13, 30, 0).unwrap();
        let tz = resolve_tz("America/New_York");
        assert_eq!(format_long_date(at, tz), "Wednesday, October 15, 2025");
    }
}
