//! Booking domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::validation::{trimmed_or_empty, validate_not_blank};
use validator::{Validate, ValidationErrors};

use super::{null_if_empty, Record, RecordKind, RecordStamp, Submission};
use crate::services::notification::{HtmlSummary, SubmissionNotification};

/// A consultation booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: String,
    pub service: String,
    /// Preferred date as entered by the visitor, `""` when not given.
    #[serde(default)]
    pub date: String,
    /// Preferred time as entered by the visitor, `""` when not given.
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub message: String,
}

/// Request payload for `POST /api/book`.
///
/// `name`, `phone` and `service` are required and must not be blank. The
/// remaining fields default to `""`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreateBookingRequest {
    #[validate(
        required(message = "Value is required"),
        custom(function = "validate_not_blank"),
        length(max = 200, message = "Must be at most 200 characters")
    )]
    pub name: Option<String>,

    #[validate(
        required(message = "Value is required"),
        custom(function = "validate_not_blank"),
        length(max = 200, message = "Must be at most 200 characters")
    )]
    pub phone: Option<String>,

    #[validate(length(max = 200, message = "Must be at most 200 characters"))]
    pub email: Option<String>,

    #[validate(
        required(message = "Value is required"),
        custom(function = "validate_not_blank"),
        length(max = 200, message = "Must be at most 200 characters")
    )]
    pub service: Option<String>,

    #[validate(length(max = 200, message = "Must be at most 200 characters"))]
    pub date: Option<String>,

    #[validate(length(max = 200, message = "Must be at most 200 characters"))]
    pub time: Option<String>,

    #[validate(length(max = 5000, message = "Must be at most 5000 characters"))]
    pub message: Option<String>,
}

impl Submission for CreateBookingRequest {
    type Record = Booking;

    fn into_record(self, stamp: RecordStamp) -> Result<Booking, ValidationErrors> {
        self.validate()?;

        Ok(Booking {
            id: stamp.id,
            created_at: stamp.created_at,
            name: trimmed_or_empty(self.name.as_deref()),
            phone: trimmed_or_empty(self.phone.as_deref()),
            email: trimmed_or_empty(self.email.as_deref()),
            service: trimmed_or_empty(self.service.as_deref()),
            date: trimmed_or_empty(self.date.as_deref()),
            time: trimmed_or_empty(self.time.as_deref()),
            message: trimmed_or_empty(self.message.as_deref()),
        })
    }
}

impl Record for Booking {
    const KIND: RecordKind = RecordKind::Booking;

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn upstream_row(&self) -> serde_json::Value {
        json!({
            "created_at": self.created_at,
            "name": self.name,
            "phone": self.phone,
            "email": self.email,
            "service": self.service,
            "date": null_if_empty(&self.date),
            "time": null_if_empty(&self.time),
            "message": self.message,
        })
    }

    fn notification(&self) -> SubmissionNotification {
        let when = format!("{} {}", self.date, self.time);
        let body = HtmlSummary::new("New Booking")
            .field("Name", &self.name)
            .field("Phone", &self.phone)
            .field("Email", &self.email)
            .field("Service", &self.service)
            .field("Date/Time", when.trim())
            .field("Message", &self.message)
            .field("ID", &self.id)
            .render();

        SubmissionNotification {
            kind: RecordKind::Booking,
            record_id: self.id.clone(),
            subject: format!("New Booking: {} - {}", self.service, self.name),
            html: body,
        }
    }
}
