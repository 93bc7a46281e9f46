//! Translates [`crate::extraction::AppliedAction`] into the
//! `mai_memory::EmailAction` shape the context builder's action-summary
//! section expects (spec §4.6 step 6). The e-mail channel persists its own
//! rows via `MemoryStore::record_email_action`/`list_email_actions`; this
//! conversion only serves the in-flight reply, so ids are left at zero.

use mai_memory::{EmailAction, EmailActionKind, EmailActionStatus, EmailActionType};

use crate::extraction::AppliedAction;

pub fn to_email_actions(applied: &[AppliedAction]) -> Vec<EmailAction> {
    applied.iter().map(to_email_action).collect()
}

fn to_email_action(applied: &AppliedAction) -> EmailAction {
    let action_type = if applied.category == "schedule" { EmailActionType::Schedule } else { EmailActionType::Memory };
    let action = match applied.action {
        "update" => EmailActionKind::Update,
        "delete" => EmailActionKind::Delete,
        _ => EmailActionKind::Add,
    };
    let status = if applied.success { EmailActionStatus::Success } else { EmailActionStatus::Failed };
    let details = match applied.event_id {
        Some(id) => serde_json::json!({ "event_id": id }),
        None => serde_json::json!({}),
    };

    EmailAction {
        id: 0,
        thread_id: 0,
        email_log_id: 0,
        action_type,
        action,
        intent: applied.intent.clone(),
        status,
        details,
        error_message: applied.error.clone(),
        executed_at: chrono::Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_maps_to_success_status_with_event_id() {
        let applied = AppliedAction {
            category: "schedule",
            action: "add",
            intent: "haircut".into(),
            success: true,
            event_id: Some(7),
            error: None,
        };
        let converted = to_email_action(&applied);
        assert_eq!(converted.status, EmailActionStatus::Success);
        assert_eq!(converted.details["event_id"], 7);
        assert_eq!(converted.action_type, EmailActionType::Schedule);
    }

    #[test]
    fn failure_maps_to_failed_status_with_error_message() {
        let applied = AppliedAction {
            category: "memory",
            action: "save",
            intent: "likes tea".into(),
            success: false,
            event_id: None,
            error: Some("db locked".into()),
        };
        let converted = to_email_action(&applied);
        assert_eq!(converted.status, EmailActionStatus::Failed);
        assert_eq!(converted.error_message.as_deref(), Some("db locked"));
        assert_eq!(converted.action, EmailActionKind::Add);
    }
}
