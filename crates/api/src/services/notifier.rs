//! Submission notifier.
//!
//! Sends an alert to the site owner for every accepted record. Supports
//! multiple providers:
//! - `sendgrid`: SendGrid v3 mail API
//! - `smtp`: SMTP relay with STARTTLS
//! - `console`: logs the alert (development)
//!
//! `auto` picks SendGrid when an API key is set, SMTP when host and
//! credentials are set, and disables notifications otherwise. Alerts are
//! dispatched on a detached task and never affect the HTTP response.

use async_trait::async_trait;
use domain::services::{NotificationResult, NotificationService, SubmissionNotification};
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::NotifyConfig;
use crate::middleware::metrics::record_notification;

/// Errors that can occur while building or using the notifier.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Failed to build notifier: {0}")]
    Build(String),

    #[error("Failed to send notification: {0}")]
    SendFailed(String),

    #[error("Provider returned {status}: {body}")]
    Provider { status: u16, body: String },
}

enum Provider {
    SendGrid {
        api_key: String,
        url: String,
        from: String,
        client: reqwest::Client,
    },
    Smtp {
        transport: AsyncSmtpTransport<Tokio1Executor>,
        from: Mailbox,
        to: Mailbox,
    },
    Console,
    Disabled,
}

/// Notifier backed by the configured provider.
pub struct Notifier {
    provider: Provider,
    recipient: String,
}

impl Notifier {
    /// Builds the notifier from configuration.
    ///
    /// Missing credentials disable notifications instead of failing startup;
    /// malformed addresses are errors.
    pub fn from_config(config: &NotifyConfig) -> Result<Self, NotifyError> {
        let recipient = config.recipient.trim().to_string();
        let requested = config.provider.to_lowercase();

        let has_sendgrid = !config.sendgrid_api_key.is_empty();
        let has_smtp = !config.smtp_host.is_empty()
            && !config.smtp_username.is_empty()
            && !config.smtp_password.is_empty();

        let choice = match requested.as_str() {
            "none" => "none",
            "console" => "console",
            "sendgrid" if has_sendgrid => "sendgrid",
            "smtp" if has_smtp => "smtp",
            "auto" if has_sendgrid => "sendgrid",
            "auto" if has_smtp => "smtp",
            "auto" => "none",
            other => {
                warn!(provider = %other, "Notification provider credentials missing, notifications disabled");
                "none"
            }
        };

        if choice != "none" && choice != "console" && recipient.is_empty() {
            warn!(provider = %choice, "No notification recipient configured, notifications disabled");
            return Ok(Self::disabled());
        }

        let provider = match choice {
            "sendgrid" => {
                let client = reqwest::Client::builder()
                    .timeout(Duration::from_secs(config.timeout_secs))
                    .build()
                    .map_err(|e| NotifyError::Build(e.to_string()))?;
                let from = if config.sender.is_empty() {
                    recipient.clone()
                } else {
                    config.sender.clone()
                };
                Provider::SendGrid {
                    api_key: config.sendgrid_api_key.clone(),
                    url: config.sendgrid_url.clone(),
                    from,
                    client,
                }
            }
            "smtp" => {
                let from_address = if config.sender.is_empty() {
                    &config.smtp_username
                } else {
                    &config.sender
                };
                let transport =
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                        .map_err(|e| NotifyError::Build(e.to_string()))?
                        .port(config.smtp_port)
                        .credentials(Credentials::new(
                            config.smtp_username.clone(),
                            config.smtp_password.clone(),
                        ))
                        .timeout(Some(Duration::from_secs(config.timeout_secs)))
                        .build();
                Provider::Smtp {
                    transport,
                    from: parse_mailbox(from_address)?,
                    to: parse_mailbox(&recipient)?,
                }
            }
            "console" => Provider::Console,
            _ => Provider::Disabled,
        };

        let notifier = Self {
            provider,
            recipient,
        };
        info!(provider = notifier.provider(), "Notifier configured");
        Ok(notifier)
    }

    /// Notifier that never sends anything.
    pub fn disabled() -> Self {
        Self {
            provider: Provider::Disabled,
            recipient: String::new(),
        }
    }

    async fn send_sendgrid(
        &self,
        notification: &SubmissionNotification,
        api_key: &str,
        url: &str,
        from: &str,
        client: &reqwest::Client,
    ) -> Result<(), NotifyError> {
        let body = json!({
            "personalizations": [{ "to": [{ "email": self.recipient }] }],
            "from": { "email": from },
            "subject": notification.subject,
            "content": [{ "type": "text/html", "value": notification.html }],
        });

        let response = client
            .post(url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::SendFailed(format!("SendGrid request failed: {}", e)))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(NotifyError::Provider { status, body })
        }
    }

    async fn send_smtp(
        &self,
        notification: &SubmissionNotification,
        transport: &AsyncSmtpTransport<Tokio1Executor>,
        from: &Mailbox,
        to: &Mailbox,
    ) -> Result<(), NotifyError> {
        let message = Message::builder()
            .from(from.clone())
            .to(to.clone())
            .subject(notification.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(notification.html.clone())
            .map_err(|e| NotifyError::Build(e.to_string()))?;

        transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| NotifyError::SendFailed(e.to_string()))
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|_| NotifyError::InvalidAddress(address.to_string()))
}

#[async_trait]
impl NotificationService for Notifier {
    fn is_enabled(&self) -> bool {
        !matches!(self.provider, Provider::Disabled)
    }

    fn provider(&self) -> &'static str {
        match self.provider {
            Provider::SendGrid { .. } => "sendgrid",
            Provider::Smtp { .. } => "smtp",
            Provider::Console => "console",
            Provider::Disabled => "none",
        }
    }

    async fn send(&self, notification: SubmissionNotification) -> NotificationResult {
        let result = match &self.provider {
            Provider::Disabled => return NotificationResult::Skipped,
            Provider::Console => {
                info!(
                    kind = %notification.kind,
                    record_id = %notification.record_id,
                    subject = %notification.subject,
                    to = %self.recipient,
                    "Submission notification (console provider)"
                );
                debug!(body_html = %notification.html, "Submission notification body");
                Ok(())
            }
            Provider::SendGrid {
                api_key,
                url,
                from,
                client,
            } => {
                self.send_sendgrid(&notification, api_key, url, from, client)
                    .await
            }
            Provider::Smtp {
                transport,
                from,
                to,
            } => self.send_smtp(&notification, transport, from, to).await,
        };

        match result {
            Ok(()) => NotificationResult::Sent,
            Err(e) => NotificationResult::Failed(e.to_string()),
        }
    }
}

/// Dispatches an alert on a detached task.
///
/// Returns `None` when the service is disabled. Failures are logged and
/// counted, never propagated.
pub fn spawn_notify(
    service: Arc<dyn NotificationService>,
    notification: SubmissionNotification,
) -> Option<JoinHandle<NotificationResult>> {
    if !service.is_enabled() {
        debug!(record_id = %notification.record_id, "Notifications disabled, skipping");
        return None;
    }

    Some(tokio::spawn(async move {
        let kind = notification.kind;
        let record_id = notification.record_id.clone();
        let provider = service.provider();

        let result = service.send(notification).await;
        match &result {
            NotificationResult::Sent => {
                info!(kind = %kind, record_id = %record_id, provider, "Notification sent");
                record_notification(provider, "sent");
            }
            NotificationResult::Skipped => {
                record_notification(provider, "skipped");
            }
            NotificationResult::Failed(error) => {
                warn!(kind = %kind, record_id = %record_id, provider, error = %error, "Notification failed");
                record_notification(provider, "failed");
            }
        }
        result
    }))
}
