use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, Utc};
use mai_memory::{MemoryError, MemoryStore, ScheduleEvent};
use tracing::{info, warn};

/// Default all-day reminder fire time (spec §4.10: "all-day events fire at
/// 09:00 local").
const ALL_DAY_REMINDER_TIME: NaiveTime = match NaiveTime::from_hms_opt(9, 0, 0) {
    Some(t) => t,
    None => unreachable!(),
};

/// Width of the due-reminder window either side of `reminder_time` (spec
/// §4.10: "within ±5 minutes").
const DUE_WINDOW: Duration = Duration::minutes(5);

/// One concrete reminder ready to send, surfaced by [`due_reminders`]. The
/// caller (the e-mail outbound path, per spec §4.13.outbound) is responsible
/// for composing and sending the message, then calling
/// [`MemoryStore::mark_reminder_sent`].
#[derive(Debug, Clone)]
pub struct DueReminder {
    pub event: ScheduleEvent,
    pub event_datetime: DateTime<Utc>,
}

/// Compute which candidate events are due for a reminder right now (spec
/// §4.10). Pure with respect to `now` so it's testable without sleeping.
pub fn due_reminders(candidates: &[ScheduleEvent], now: DateTime<Utc>, tz: &chrono_tz::Tz) -> Vec<DueReminder> {
    let mut due = Vec::new();
    for event in candidates {
        let event_time = event.event_time.unwrap_or(ALL_DAY_REMINDER_TIME);
        let naive = NaiveDateTime::new(event.event_date, event_time);
        let event_datetime = match naive.and_local_timezone(*tz).single() {
            Some(dt) => dt.with_timezone(&Utc),
            None => continue,
        };

        let reminder_time = event_datetime - Duration::minutes(event.reminder_lead_minutes);
        let delta = (now - reminder_time).num_seconds().abs();
        if delta <= DUE_WINDOW.num_seconds() && now < event_datetime {
            due.push(DueReminder { event: event.clone(), event_datetime });
        }
    }
    due
}

/// One sweep of the reminder loop (spec §4.10): read candidates, compute due
/// reminders, hand each to `send`, and mark it sent atomically with a
/// successful send so a crash mid-sweep can't double-send.
pub async fn run_sweep<F, Fut>(store: &MemoryStore, now: DateTime<Utc>, tz: &chrono_tz::Tz, send: F) -> Result<usize, MemoryError>
where
    F: Fn(DueReminder) -> Fut,
    Fut: std::future::Future<Output = Result<(), String>>,
{
    let candidates = store.reminder_candidates(now.date_naive())?;
    let due = due_reminders(&candidates, now, tz);
    let mut sent = 0;
    for reminder in due {
        let event_id = reminder.event.id;
        match send(reminder).await {
            Ok(()) => {
                store.mark_reminder_sent(event_id)?;
                sent += 1;
                info!(event_id, "reminder sent");
            }
            Err(err) => warn!(event_id, error = %err, "reminder send failed, will retry next sweep"),
        }
    }
    if sent > 0 {
        info!(sent, "reminder sweep complete");
    }
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn sample_event(date: NaiveDate, time: Option<NaiveTime>, lead: i64) -> ScheduleEvent {
        ScheduleEvent {
            id: 1,
            user_name: "alice".into(),
            title: "dentist".into(),
            event_date: date,
            event_time: time,
            description: None,
            importance: 5,
            active: true,
            reminder_enabled: true,
            reminder_lead_minutes: lead,
            recipient_email: Some("alice@example.com".into()),
            reminder_sent: false,
            reminder_sent_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn due_within_window_before_event() {
        let tz: chrono_tz::Tz = chrono_tz::America::New_York;
        let date = NaiveDate::from_ymd_opt(2025, 10, 24).unwrap();
        let event = sample_event(date, Some(NaiveTime::from_hms_opt(14, 0, 0).unwrap()), 30);
        let event_dt = tz
            .from_local_datetime(&NaiveDateTime::new(date, NaiveTime::from_hms_opt(14, 0, 0).unwrap()))
            .unwrap()
            .with_timezone(&Utc);
        let now = event_dt - Duration::minutes(30);

        let due = due_reminders(&[event], now, &tz);
        assert_eq!(due.len(), 1);
    }

    #[test]
    fn not_due_outside_window() {
        let tz: chrono_tz::Tz = chrono_tz::America::New_York;
        let date = NaiveDate::from_ymd_opt(2025, 10, 24).unwrap();
        let event = sample_event(date, Some(NaiveTime::from_hms_opt(14, 0, 0).unwrap()), 30);
        let event_dt = tz
            .from_local_datetime(&NaiveDateTime::new(date, NaiveTime::from_hms_opt(14, 0, 0).unwrap()))
            .unwrap()
            .with_timezone(&Utc);
        let now = event_dt - Duration::hours(2);

        let due = due_reminders(&[event], now, &tz);
        assert!(due.is_empty());
    }

    #[test]
    fn all_day_event_uses_nine_am_local() {
        let tz: chrono_tz::Tz = chrono_tz::America::New_York;
        let date = NaiveDate::from_ymd_opt(2025, 10, 24).unwrap();
        let event = sample_event(date, None, 0);
        let nine_am = tz
            .from_local_datetime(&NaiveDateTime::new(date, NaiveTime::from_hms_opt(9, 0, 0).unwrap()))
            .unwrap()
            .with_timezone(&Utc);

        let due = due_reminders(&[event], nine_am, &tz);
        assert_eq!(due.len(), 1);
    }

    #[test]
    fn past_event_is_never_due() {
        let tz: chrono_tz::Tz = chrono_tz::America::New_York;
        let date = NaiveDate::from_ymd_opt(2025, 10, 24).unwrap();
        let event = sample_event(date, Some(NaiveTime::from_hms_opt(14, 0, 0).unwrap()), 30);
        let event_dt = tz
            .from_local_datetime(&NaiveDateTime::new(date, NaiveTime::from_hms_opt(14, 0, 0).unwrap()))
            .unwrap()
            .with_timezone(&Utc);
        let now = event_dt + Duration::minutes(1);

        let due = due_reminders(&[event], now, &tz);
        assert!(due.is_empty(), "reminder_time already passed the event itself");
    }
}
