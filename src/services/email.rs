//! Loan notifications
//!
//! Delivery is best effort: `EmailService` never returns an error. Every
//! attempt yields a `NotificationOutcome` the caller reports next to the
//! committed loan.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use serde::Serialize;
use std::{str::FromStr, sync::Arc};
use thiserror::Error;
use utoipa::ToSchema;

use crate::{
    config::{EmailConfig, EmailTransport},
    models::dates::display_date,
};

/// A rendered message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifyError {
    /// The mail service could not be reached at all
    #[error("{0}")]
    Network(String),
    /// The mail service answered but refused the message
    #[error("{0}")]
    Rejected(String),
}

impl NotifyError {
    pub fn kind(&self) -> FailureKind {
        match self {
            NotifyError::Network(_) => FailureKind::NetworkBlocked,
            NotifyError::Rejected(_) => FailureKind::Other,
        }
    }
}

/// Outbound delivery seam
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network or cross-origin block; delivery never started
    NetworkBlocked,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct NotificationFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// Result of one notification attempt, carried back to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct NotificationOutcome {
    pub success: bool,
    pub recipient: String,
    pub subject: String,
    /// Rendered body, kept so the receipt can be previewed when delivery fails
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<NotificationFailure>,
}

#[derive(Clone)]
pub struct EmailService {
    notifier: Arc<dyn Notifier>,
}

impl EmailService {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Issue receipt for a new loan
    pub async fn notify_borrow(&self, to: &str, book_name: &str, due: DateTime<Utc>) -> NotificationOutcome {
        let message = EmailMessage {
            to: to.to_string(),
            subject: format!("Issue Receipt: {}", book_name),
            html: borrow_template(to, book_name, &display_date(due)),
        };
        self.deliver(message).await
    }

    /// Confirmation that a loan is closed
    pub async fn notify_return(&self, to: &str, book_name: &str) -> NotificationOutcome {
        let message = EmailMessage {
            to: to.to_string(),
            subject: format!("Return Confirmation: {}", book_name),
            html: return_template(to, book_name),
        };
        self.deliver(message).await
    }

    async fn deliver(&self, message: EmailMessage) -> NotificationOutcome {
        let result = self.notifier.send(&message).await;
        let error = match result {
            Ok(()) => {
                tracing::info!(recipient = %message.to, subject = %message.subject, "Notification sent");
                None
            }
            Err(e) => {
                tracing::warn!(recipient = %message.to, kind = ?e.kind(), error = %e, "Notification failed");
                Some(NotificationFailure {
                    kind: e.kind(),
                    message: e.to_string(),
                })
            }
        };

        NotificationOutcome {
            success: error.is_none(),
            recipient: message.to,
            subject: message.subject,
            html: message.html,
            error,
        }
    }
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn borrow_template(to: &str, book_name: &str, due: &str) -> String {
    format!(
        r#"<div style="font-family: sans-serif; max-width: 600px; border: 1px solid #eee; padding: 20px; border-radius: 10px; color: #334155;">
  <h2 style="color: #4f46e5; margin-bottom: 5px;">Book Issue Receipt</h2>
  <p style="font-size: 14px; color: #64748b;">SmartLib Management System</p>
  <hr style="border: 0; border-top: 1px solid #f1f5f9; margin: 20px 0;" />
  <p>The following book has been checked out to: <strong>{to}</strong></p>
  <div style="background: #f8fafc; padding: 20px; border-radius: 12px; margin: 20px 0; border: 1px solid #e2e8f0;">
    <span style="font-size: 11px; font-weight: 800; text-transform: uppercase; color: #94a3b8;">Title</span>
    <div style="font-size: 18px; font-weight: 900; color: #1e293b; margin-top: 4px;">{book}</div>
  </div>
  <p style="font-size: 14px;">Please return it by:</p>
  <div style="font-size: 24px; font-weight: 900; color: #e11d48;">{due}</div>
</div>"#,
        to = escape_html(to),
        book = escape_html(book_name),
        due = due,
    )
}

fn return_template(to: &str, book_name: &str) -> String {
    format!(
        r#"<div style="font-family: sans-serif; max-width: 600px; border: 1px solid #eee; padding: 20px; border-radius: 10px; color: #334155;">
  <h2 style="color: #10b981; margin-bottom: 5px;">Return Confirmation</h2>
  <p style="font-size: 14px; color: #64748b;">SmartLib Management System</p>
  <hr style="border: 0; border-top: 1px solid #f1f5f9; margin: 20px 0;" />
  <p>Book returned successfully:</p>
  <div style="background: #f0fdf4; padding: 20px; border-radius: 12px; margin: 20px 0; border: 1px solid #dcfce7;">
    <div style="font-size: 18px; font-weight: 900; color: #065f46;">{book}</div>
  </div>
  <p>The loan for <strong>{to}</strong> is now closed.</p>
</div>"#,
        to = escape_html(to),
        book = escape_html(book_name),
    )
}

/// Delivers through an SMTP relay
#[derive(Clone)]
pub struct SmtpNotifier {
    config: EmailConfig,
}

impl SmtpNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, message: &EmailMessage) -> Result<Message, NotifyError> {
        let from_name = self.config.from_name.as_deref().unwrap_or("SmartLib");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.from))
            .map_err(|e| NotifyError::Rejected(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(&message.to)
            .map_err(|e| NotifyError::Rejected(format!("Invalid to address: {}", e)))?;

        Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(message.subject.clone())
            .multipart(
                MultiPart::alternative().singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(message.html.clone()),
                ),
            )
            .map_err(|e| NotifyError::Rejected(format!("Failed to build email: {}", e)))
    }

    fn transport(&self) -> Result<SmtpTransport, NotifyError> {
        let mailer_builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| NotifyError::Network(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer_builder = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            mailer_builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer_builder
        };

        Ok(mailer_builder.build())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        let email = self.build_message(message)?;
        let mailer = self.transport()?;

        // lettre's SmtpTransport is blocking
        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| NotifyError::Rejected(format!("Mail task failed: {}", e)))?
            .map_err(|e| {
                if e.is_transient() || e.is_permanent() {
                    NotifyError::Rejected(format!("Failed to send email: {}", e))
                } else {
                    NotifyError::Network(format!("Failed to send email: {}", e))
                }
            })?;

        Ok(())
    }
}

/// Delivers through a JSON email API such as Resend
#[derive(Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
    config: EmailConfig,
}

#[derive(Serialize)]
struct ApiEmail<'a> {
    from: String,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

impl HttpNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        let from = match &self.config.from_name {
            Some(name) => format!("{} <{}>", name, self.config.from),
            None => self.config.from.clone(),
        };
        let body = ApiEmail {
            from,
            to: [message.to.as_str()],
            subject: &message.subject,
            html: &message.html,
        };

        let mut request = self.client.post(&self.config.api_url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() || e.is_request() {
                NotifyError::Network(format!("Email API unreachable: {}", e))
            } else {
                NotifyError::Rejected(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(format!("HTTP {}", status.as_u16())));
        }
        Ok(())
    }
}

/// Build the notifier selected by `email.transport`
pub fn notifier_from_config(config: &EmailConfig) -> Arc<dyn Notifier> {
    match config.transport {
        EmailTransport::Smtp => Arc::new(SmtpNotifier::new(config.clone())),
        EmailTransport::Http => Arc::new(HttpNotifier::new(config.clone())),
    }
}
