//! Notification service for submission alerts.
//!
//! Provides the message model and the service abstraction used to announce
//! newly accepted records to the site owner.

use serde::Serialize;
use std::sync::{Arc, Mutex};

use crate::models::RecordKind;

/// Alert announcing one accepted record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionNotification {
    pub kind: RecordKind,
    pub record_id: String,
    pub subject: String,
    pub html: String,
}

/// Result of a notification send attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationResult {
    /// Notification was handed to the provider.
    Sent,
    /// No provider or recipient is configured.
    Skipped,
    /// Sending failed. The submission itself is unaffected.
    Failed(String),
}

/// Notification service trait for sending submission alerts.
#[async_trait::async_trait]
pub trait NotificationService: Send + Sync {
    /// Whether a provider and recipient are configured.
    fn is_enabled(&self) -> bool;

    /// Short provider name for logs and metrics.
    fn provider(&self) -> &'static str;

    /// Send one alert.
    async fn send(&self, notification: SubmissionNotification) -> NotificationResult;
}

/// Builds the small HTML summary used as alert body.
#[derive(Debug, Clone)]
pub struct HtmlSummary {
    heading: String,
    rows: Vec<(String, String)>,
}

impl HtmlSummary {
    pub fn new(heading: &str) -> Self {
        Self {
            heading: heading.to_string(),
            rows: Vec::new(),
        }
    }

    /// Adds a labelled value. Empty values render as `-`.
    pub fn field(mut self, label: &str, value: &str) -> Self {
        let value = if value.trim().is_empty() { "-" } else { value };
        self.rows.push((label.to_string(), value.to_string()));
        self
    }

    pub fn render(&self) -> String {
        let mut html = format!("<h3>{}</h3>\n", escape_html(&self.heading));
        for (label, value) in &self.rows {
            html.push_str(&format!(
                "<p><strong>{}:</strong> {}</p>\n",
                escape_html(label),
                escape_html(value)
            ));
        }
        html
    }
}

/// Escapes the characters that are significant in HTML text and attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
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

/// Mock notification service for development and testing.
///
/// Records every alert it is asked to send.
#[derive(Debug, Clone, Default)]
pub struct MockNotificationService {
    /// Whether to simulate failures for testing.
    pub simulate_failure: bool,
    sent: Arc<Mutex<Vec<SubmissionNotification>>>,
}

impl MockNotificationService {
    /// Create a new mock notification service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock service that simulates failures.
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    /// Alerts received so far, including ones that simulated a failure.
    pub fn sent(&self) -> Vec<SubmissionNotification> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl NotificationService for MockNotificationService {
    fn is_enabled(&self) -> bool {
        true
    }

    fn provider(&self) -> &'static str {
        "mock"
    }

    async fn send(&self, notification: SubmissionNotification) -> NotificationResult {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(notification.clone());
        }

        if self.simulate_failure {
            tracing::warn!(
                record_id = %notification.record_id,
                "Mock notification service simulating failure"
            );
            return NotificationResult::Failed("Simulated failure".to_string());
        }

        tracing::info!(
            kind = %notification.kind,
            record_id = %notification.record_id,
            subject = %notification.subject,
            "Mock: Would send submission notification"
        );

        NotificationResult::Sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification() -> SubmissionNotification {
        SubmissionNotification {
            kind: RecordKind::Enquiry,
            record_id: "enq_1".to_string(),
            subject: "New Enquiry - Kavya".to_string(),
            html: "<h3>New Enquiry</h3>".to_string(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<script>alert('x') & \"y\"</script>"),
            "&lt;script&gt;alert(&#39;x&#39;) &amp; &quot;y&quot;&lt;/script&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_html_summary_renders_fields() {
        let html = HtmlSummary::new("New Booking")
            .field("Name", "Asha")
            .field("Message", "")
            .render();
        assert!(html.starts_with("<h3>New Booking</h3>"));
        assert!(html.contains("<p><strong>Name:</strong> Asha</p>"));
        assert!(html.contains("<p><strong>Message:</strong> -</p>"));
    }

    #[test]
    fn test_html_summary_escapes_values() {
        let html = HtmlSummary::new("New Enquiry")
            .field("Message", "<b>hi</b>")
            .render();
        assert!(html.contains("&lt;b&gt;hi&lt;/b&gt;"));
        assert!(!html.contains("<b>hi</b>"));
    }

    #[tokio::test]
    async fn test_mock_notification_service_records() {
        let service = MockNotificationService::new();
        let result = service.send(notification()).await;
        assert_eq!(result, NotificationResult::Sent);
        assert_eq!(service.sent().len(), 1);
        assert_eq!(service.sent()[0].record_id, "enq_1");
    }

    #[tokio::test]
    async fn test_mock_notification_service_failure() {
        let service = MockNotificationService::failing();
        let result = service.send(notification()).await;
        assert!(matches!(result, NotificationResult::Failed(_)));
        assert_eq!(service.sent().len(), 1);
    }

    #[test]
    fn test_mock_clones_share_history() {
        let service = MockNotificationService::new();
        let clone = service.clone();
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        rt.block_on(clone.send(notification()));
        assert_eq!(service.sent().len(), 1);
    }
}
