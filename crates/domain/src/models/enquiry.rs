//! Enquiry domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::validation::{is_blank, trimmed_or_empty};
use validator::{Validate, ValidationError, ValidationErrors};

use super::{Record, RecordKind, RecordStamp, Submission};
use crate::services::notification::{HtmlSummary, SubmissionNotification};

/// A general enquiry from a site visitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enquiry {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

/// Request payload for `POST /api/enquire`.
///
/// Every field is optional, but at least one of `name`, `phone` or `email`
/// must be non-blank so the enquiry can be answered.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_contact_present"))]
pub struct CreateEnquiryRequest {
    #[validate(length(max = 200, message = "Must be at most 200 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 200, message = "Must be at most 200 characters"))]
    pub phone: Option<String>,

    #[validate(length(max = 200, message = "Must be at most 200 characters"))]
    pub email: Option<String>,

    #[validate(length(max = 5000, message = "Must be at most 5000 characters"))]
    pub message: Option<String>,
}

fn validate_contact_present(request: &CreateEnquiryRequest) -> Result<(), ValidationError> {
    if is_blank(request.name.as_deref())
        && is_blank(request.phone.as_deref())
        && is_blank(request.email.as_deref())
    {
        let mut err = ValidationError::new("contact_required");
        err.message =
            Some("Provide at least one contact field (name, email, or phone)".into());
        Err(err)
    } else {
        Ok(())
    }
}

impl Submission for CreateEnquiryRequest {
    type Record = Enquiry;

    fn into_record(self, stamp: RecordStamp) -> Result<Enquiry, ValidationErrors> {
        self.validate()?;

        Ok(Enquiry {
            id: stamp.id,
            created_at: stamp.created_at,
            name: trimmed_or_empty(self.name.as_deref()),
            phone: trimmed_or_empty(self.phone.as_deref()),
            email: trimmed_or_empty(self.email.as_deref()),
            message: trimmed_or_empty(self.message.as_deref()),
        })
    }
}

impl Enquiry {
    /// The first non-empty contact detail, used to title notifications.
    pub fn contact_label(&self) -> &str {
        [&self.name, &self.phone, &self.email]
            .into_iter()
            .find(|v| !v.is_empty())
            .map(String::as_str)
            .unwrap_or("-")
    }
}

impl Record for Enquiry {
    const KIND: RecordKind = RecordKind::Enquiry;

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
            "message": self.message,
        })
    }

    fn notification(&self) -> SubmissionNotification {
        let body = HtmlSummary::new("New Enquiry Received")
            .field("Name", &self.name)
            .field("Phone", &self.phone)
            .field("Email", &self.email)
            .field("Message", &self.message)
            .field("ID", &self.id)
            .render();

        SubmissionNotification {
            kind: RecordKind::Enquiry,
            record_id: self.id.clone(),
            subject: format!("New Enquiry - {}", self.contact_label()),
            html: body,
        }
    }
}
