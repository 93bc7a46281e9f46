//! IMAP polling and SMTP sending. This is the one file in the crate that
//! touches real mail-server wire protocols; everything upstream of it
//! (thread resolution, attachment analysis, reply composition) is pure and
//! tested independently, the way `mai-mumble`'s transport boundary works.

use async_trait::async_trait;
use lettre::message::header::{Header, HeaderName, HeaderValue};
use lettre::message::{Message, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};
use mai_memory::EmailSettings;

use crate::error::EmailError;
use crate::reply::ReplyEnvelope;

#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Fetch and return the raw RFC822 bytes of every unseen message in the
    /// configured mailbox (spec §4.13 "fetch UNSEEN").
    async fn fetch_unseen(&mut self) -> Result<Vec<Vec<u8>>, EmailError>;

    async fn send(&mut self, from: &str, envelope: &ReplyEnvelope) -> Result<(), EmailError>;
}

pub struct ImapSmtpTransport {
    settings: EmailSettings,
}

impl ImapSmtpTransport {
    pub fn new(settings: EmailSettings) -> Self {
        Self { settings }
    }
}

struct RawHeader(&'static str, String);

impl Header for RawHeader {
    fn name() -> HeaderName {
        // Only constructed internally with known-valid names; see callers.
        HeaderName::new_from_ascii("X-Mai-Placeholder".to_string()).expect("static header name")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(RawHeader("X-Mai-Placeholder", s.to_string()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(HeaderName::new_from_ascii(self.0.to_string()).expect("static header name"), self.1.clone())
    }
}

fn build_mime_message(from: &str, envelope: &ReplyEnvelope) -> Result<Message, EmailError> {
    let mut builder = Message::builder()
        .from(from.parse().map_err(|e| EmailError::MalformedMessage(format!("bad from address: {e}")))?)
        .to(envelope.to.parse().map_err(|e| EmailError::MalformedMessage(format!("bad to address: {e}")))?)
        .subject(&envelope.subject);

    if let Some(id) = &envelope.in_reply_to {
        builder = builder.header(RawHeader("In-Reply-To", id.clone()));
    }
    if !envelope.references.is_empty() {
        builder = builder.header(RawHeader("References", envelope.references.join(" ")));
    }

    builder
        .multipart(MultiPart::alternative_plain_html(envelope.plain_body.clone(), envelope.html_body.clone()))
        .map_err(|e| EmailError::MalformedMessage(e.to_string()))
}

#[async_trait]
impl MailTransport for ImapSmtpTransport {
    async fn fetch_unseen(&mut self) -> Result<Vec<Vec<u8>>, EmailError> {
        let settings = self.settings.clone();
        tokio::task::spawn_blocking(move || fetch_unseen_blocking(&settings))
            .await
            .map_err(|e| EmailError::Imap(e.to_string()))?
    }

    async fn send(&mut self, from: &str, envelope: &ReplyEnvelope) -> Result<(), EmailError> {
        let settings = self.settings.clone();
        let from = from.to_string();
        let envelope = envelope.clone();
        tokio::task::spawn_blocking(move || send_blocking(&settings, &from, &envelope))
            .await
            .map_err(|e| EmailError::Smtp(e.to_string()))?
    }
}

fn fetch_unseen_blocking(settings: &EmailSettings) -> Result<Vec<Vec<u8>>, EmailError> {
    let host = settings.imap_host.clone().ok_or_else(|| EmailError::Imap("imap_host not configured".into()))?;
    let port = settings.imap_port.unwrap_or(993);
    let tls = native_tls::TlsConnector::builder().build().map_err(|e| EmailError::Imap(e.to_string()))?;
    let client = imap::connect((host.as_str(), port), &host, &tls).map_err(|e| EmailError::Imap(e.to_string()))?;
    let mut session = client
        .login(settings.imap_username.clone().unwrap_or_default(), settings.imap_password.clone().unwrap_or_default())
        .map_err(|(e, _)| EmailError::Imap(e.to_string()))?;

    let mailbox = if settings.imap_mailbox.is_empty() { "INBOX" } else { &settings.imap_mailbox };
    session.select(mailbox).map_err(|e| EmailError::Imap(e.to_string()))?;

    let uids = session.search("UNSEEN").map_err(|e| EmailError::Imap(e.to_string()))?;
    let mut messages = Vec::new();
    for uid in uids {
        let fetched = session.fetch(uid.to_string(), "RFC822").map_err(|e| EmailError::Imap(e.to_string()))?;
        for m in fetched.iter() {
            if let Some(body) = m.body() {
                messages.push(body.to_vec());
            }
        }
    }
    let _ = session.logout();
    Ok(messages)
}

fn send_blocking(settings: &EmailSettings, from: &str, envelope: &ReplyEnvelope) -> Result<(), EmailError> {
    let message = build_mime_message(from, envelope)?;

    let host = settings.smtp_host.clone().ok_or_else(|| EmailError::Smtp("smtp_host not configured".into()))?;
    let creds = Credentials::new(
        settings.smtp_username.clone().unwrap_or_default(),
        settings.smtp_password.clone().unwrap_or_default(),
    );

    let mailer = if settings.smtp_use_ssl {
        SmtpTransport::relay(&host).map_err(|e| EmailError::Smtp(e.to_string()))?.credentials(creds).build()
    } else {
        SmtpTransport::starttls_relay(&host).map_err(|e| EmailError::Smtp(e.to_string()))?.credentials(creds).build()
    };

    mailer.send(&message).map_err(|e| EmailError::Smtp(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod mock {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct MockTransport {
        pub inbox: Mutex<Vec<Vec<u8>>>,
        pub sent: Mutex<Vec<(String, ReplyEnvelope)>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_message(&self, raw: Vec<u8>) {
            self.inbox.lock().unwrap().push(raw);
        }
    }

    #[async_trait]
    impl MailTransport for MockTransport {
        async fn fetch_unseen(&mut self) -> Result<Vec<Vec<u8>>, EmailError> {
            Ok(std::mem::take(&mut *self.inbox.lock().unwrap()))
        }

        async fn send(&mut self, from: &str, envelope: &ReplyEnvelope) -> Result<(), EmailError> {
            self.sent.lock().unwrap().push((from.to_string(), envelope.clone()));
            Ok(())
        }
    }
}
