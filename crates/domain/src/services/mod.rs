//! Domain services for Consult Desk.

pub mod notification;

pub use notification::{
    escape_html, HtmlSummary, MockNotificationService, NotificationResult, NotificationService,
    SubmissionNotification,
};
