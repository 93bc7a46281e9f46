//! One IMAP polling cycle (spec §4.13): parse → resolve identity → analyze
//! attachments → resolve thread → log → action-synchronous extraction →
//! reply → send → log the outcome.

use mai_core::Role;
use mai_dialog::extraction::AppliedAction;
use mai_dialog::DialogOrchestrator;
use mai_llm::LlmClient;
use mai_memory::{
    EmailActionKind, EmailActionStatus, EmailActionType, EmailDirection, EmailLog, EmailLogStatus, EmailType,
    MemoryStore,
};
use tracing::{info, warn};

use crate::error::EmailError;
use crate::transport::MailTransport;
use crate::{attachments, mime, reply, thread};

const PREVIEW_LEN: usize = 200;

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        text.to_string()
    } else {
        format!("{}...", &text[..max])
    }
}

/// Fetch and process every unseen message. Returns the count successfully
/// processed; one malformed or failing message is logged and skipped
/// rather than aborting the cycle (spec §7: "one bad message cannot take
/// down the process").
pub async fn poll_once(
    transport: &mut dyn MailTransport,
    store: &MemoryStore,
    dialog: &DialogOrchestrator,
    llm: &LlmClient,
    bot_email: &str,
) -> Result<usize, EmailError> {
    let raws = transport.fetch_unseen().await?;
    let mut processed = 0;
    for raw in raws {
        match process_one(transport, store, dialog, llm, bot_email, &raw).await {
            Ok(()) => processed += 1,
            Err(e) => warn!(error = %e, "failed to process inbound email, skipping"),
        }
    }
    Ok(processed)
}

async fn process_one(
    transport: &mut dyn MailTransport,
    store: &MemoryStore,
    dialog: &DialogOrchestrator,
    llm: &LlmClient,
    bot_email: &str,
    raw: &[u8],
) -> Result<(), EmailError> {
    let parsed = mime::parse(raw)?;
    let mapped_user = store.resolve_user_for_email(&parsed.from_address)?;
    if mapped_user.is_none() {
        warn!(from = %parsed.from_address, "email sender not in mapping, using raw address as identity");
    }
    let user_name = mapped_user.clone().unwrap_or_else(|| parsed.from_address.clone());

    let mut attachment_metas = Vec::new();
    let mut attachment_excerpts = Vec::new();
    for attachment in &parsed.attachments {
        let analyzed = attachments::analyze(llm, &attachment.filename, &attachment.content_type, &attachment.bytes).await;
        if let Some(excerpt) = analyzed.turn_text_excerpt {
            attachment_excerpts.push(excerpt);
        }
        attachment_metas.push(analyzed.metadata);
    }

    let normalized_subject = thread::normalize_subject(&parsed.subject);
    let thread_id =
        store.find_or_create_thread(&parsed.subject, &normalized_subject, &parsed.from_address, mapped_user.as_deref())?;

    let mut turn_text = parsed.body_text.clone();
    if !attachment_excerpts.is_empty() {
        turn_text.push_str("\n\n");
        turn_text.push_str(&attachment_excerpts.join("\n\n"));
    }

    let log_id = store.log_email(
        EmailDirection::Received,
        EmailType::Other,
        &parsed.from_address,
        bot_email,
        &parsed.subject,
        &truncate(&parsed.body_text, PREVIEW_LEN),
        &parsed.body_text,
        EmailLogStatus::Success,
        None,
        mapped_user.as_deref(),
        Some(thread_id),
        &attachment_metas,
    )?;

    store.add_thread_message(thread_id, Some(log_id), Role::User, &parsed.body_text, parsed.message_id.as_deref())?;

    let channel_session = format!("email:{}", parsed.from_address);
    let (outcome, applied) = dialog.handle_email_turn(&user_name, &channel_session, &turn_text).await?;

    for action in &applied {
        record_applied_action(store, thread_id, log_id, action)?;
    }
    store.add_thread_message(thread_id, Some(log_id), Role::Assistant, &outcome.reply, None)?;

    let envelope = reply::build_reply(&parsed.from_address, &parsed.subject, parsed.message_id.as_deref(), parsed.references, &outcome.reply);

    match transport.send(bot_email, &envelope).await {
        Ok(()) => {
            store.log_email(
                EmailDirection::Sent,
                EmailType::Reply,
                bot_email,
                &parsed.from_address,
                &envelope.subject,
                &truncate(&outcome.reply, PREVIEW_LEN),
                &outcome.reply,
                EmailLogStatus::Success,
                None,
                mapped_user.as_deref(),
                Some(thread_id),
                &[],
            )?;
            info!(thread_id, log_id, "email processed and replied");
        }
        Err(e) => {
            store.log_email(
                EmailDirection::Sent,
                EmailType::Reply,
                bot_email,
                &parsed.from_address,
                &envelope.subject,
                &truncate(&outcome.reply, PREVIEW_LEN),
                &outcome.reply,
                EmailLogStatus::Error,
                Some(&e.to_string()),
                mapped_user.as_deref(),
                Some(thread_id),
                &[],
            )?;
            warn!(error = %e, "smtp send failed; reply deferred to next polling cycle retry");
        }
    }
    Ok(())
}

fn record_applied_action(store: &MemoryStore, thread_id: i64, log_id: i64, action: &AppliedAction) -> Result<(), EmailError> {
    let action_type = if action.category == "schedule" { EmailActionType::Schedule } else { EmailActionType::Memory };
    let kind = match action.action {
        "update" => EmailActionKind::Update,
        "delete" => EmailActionKind::Delete,
        _ => EmailActionKind::Add,
    };
    let status = if action.success { EmailActionStatus::Success } else { EmailActionStatus::Failed };
    let details = match action.event_id {
        Some(id) => serde_json::json!({ "event_id": id }),
        None => serde_json::json!({}),
    };
    store.record_email_action(thread_id, log_id, action_type, kind, &action.intent, status, details, action.error.as_deref())?;
    Ok(())
}

/// Admin-initiated SMTP resend (spec §4.13 "Retry semantics": "reusing
/// stored body, attempt direct resend; on success, flip the existing log
/// row to success"). Threading headers aren't persisted on the log row, so
/// the resend carries only `To`/`Subject`/body — acceptable since it's a
/// same-thread continuation, not a fresh reply.
pub async fn retry_failed_send(transport: &mut dyn MailTransport, store: &MemoryStore, bot_email: &str, log_id: i64) -> Result<(), EmailError> {
    let log = store
        .get_email_log(log_id)?
        .ok_or_else(|| EmailError::MalformedMessage(format!("no email log row {log_id}")))?;
    let envelope = envelope_from_log(&log);
    transport.send(bot_email, &envelope).await?;
    store.mark_email_log_status(log_id, EmailLogStatus::Success, None)?;
    Ok(())
}

fn envelope_from_log(log: &EmailLog) -> reply::ReplyEnvelope {
    reply::ReplyEnvelope {
        to: log.to_addr.clone(),
        subject: log.subject.clone(),
        in_reply_to: None,
        references: Vec::new(),
        plain_body: log.full_body.clone(),
        html_body: format!("<p>{}</p>", log.full_body.replace('\n', "<br>")),
    }
}
