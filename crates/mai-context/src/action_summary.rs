//! Action-summary section (spec §4.6 step 6, e-mail only): a tallied,
//! plain-English record of what was just done, then a detailed per-action
//! breakdown, so the reply prompt can report truthfully (spec §8 "Action
//! truthfulness").

use mai_memory::{EmailAction, EmailActionStatus};

pub fn format(actions: &[EmailAction]) -> String {
    if actions.is_empty() {
        return "No memory or schedule actions were taken for this message.".to_string();
    }

    let succeeded = actions.iter().filter(|a| a.status == EmailActionStatus::Success).count();
    let failed = actions.iter().filter(|a| a.status == EmailActionStatus::Failed).count();
    let skipped = actions.iter().filter(|a| a.status == EmailActionStatus::Skipped).count();

    let mut out = String::new();
    out.push_str(&format!(
        "Actions taken for this message: {succeeded} succeeded, {failed} failed, {skipped} skipped.\n"
    ));
    out.push_str("Details (report only what is listed here, nothing else):\n");
    for action in actions {
        let detail = match action.status {
            EmailActionStatus::Success => {
                let event_id = action.details.get("event_id").and_then(|v| v.as_i64());
                match event_id {
                    Some(id) => format!(
                        "- {} {} succeeded: {} (event id {id})",
                        action.action_type, action.action, action.intent
                    ),
                    None => format!("- {} {} succeeded: {}", action.action_type, action.action, action.intent),
                }
            }
            EmailActionStatus::Failed => format!(
                "- {} {} failed: {}{}",
                action.action_type,
                action.action,
                action.intent,
                action
                    .error_message
                    .as_deref()
                    .map(|e| format!(" ({e})"))
                    .unwrap_or_default()
            ),
            EmailActionStatus::Skipped => {
                format!("- {} {} skipped: {}", action.action_type, action.action, action.intent)
            }
        };
        out.push_str(&detail);
        out.push('\n');
    }
    out.push_str("Use correct ownership language (\"I added\", not \"thank you for adding\"). \
                   Do not mention unrelated events.");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mai_memory::{EmailActionKind, EmailActionType};

    fn action(status: EmailActionStatus, event_id: Option<i64>) -> EmailAction {
        EmailAction {
            id: 1,
            thread_id: 1,
            email_log_id: 1,
            action_type: EmailActionType::Schedule,
            action: EmailActionKind::Add,
            intent: "Flight AA123 on Nov 5".into(),
            status,
            details: event_id.map(|id| serde_json::json!({"event_id": id})).unwrap_or(serde_json::json!({})),
            error_message: None,
            executed_at: Utc::now(),
        }
    }

    #[test]
    fn empty_actions_says_nothing_done() {
        assert!(format(&[]).contains("No memory or schedule actions"));
    }

    #[test]
    fn success_includes_event_id() {
        let out = format(&[action(EmailActionStatus::Success, Some(42))]);
        assert!(out.contains("event id 42"));
        assert!(out.contains("1 succeeded, 0 failed, 0 skipped"));
    }
}
