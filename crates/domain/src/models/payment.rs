//! Payment record domain model.
//!
//! Payments are recorded, not processed: the record documents the amount a
//! visitor intends to pay for a service and starts out `PENDING`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::validation::{parse_amount, trimmed_or_empty, validate_amount};
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError, ValidationErrors};

use super::{Record, RecordKind, RecordStamp, Submission};
use crate::services::notification::{HtmlSummary, SubmissionNotification};

/// Currency symbol used in payment notifications.
pub const CURRENCY_SYMBOL: &str = "₹";

/// Lifecycle status of a payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PAID" => Ok(PaymentStatus::Paid),
            "FAILED" => Ok(PaymentStatus::Failed),
            _ => Err(format!("Unknown payment status: {}", s)),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "PENDING"),
            PaymentStatus::Paid => write!(f, "PAID"),
            PaymentStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Amount as submitted: JSON number or numeric text such as `"199.50"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(f64),
    Text(String),
}

impl AmountInput {
    /// The amount as a finite, strictly positive number.
    pub fn value(&self) -> Option<f64> {
        match self {
            AmountInput::Number(n) => validate_amount(*n).ok().map(|_| *n),
            AmountInput::Text(s) => parse_amount(s),
        }
    }
}

/// A recorded payment intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    pub amount: f64,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub status: PaymentStatus,
}

/// Request payload for `POST /api/payment`.
///
/// - `amount` is required and must parse to a positive number.
/// - `status` defaults to `PENDING`; when given it must be `PENDING`, `PAID`
///   or `FAILED` (case-insensitive).
/// - The contact and service fields default to `""`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_payment_amount"))]
pub struct CreatePaymentRequest {
    #[validate(length(max = 200, message = "Must be at most 200 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 200, message = "Must be at most 200 characters"))]
    pub phone: Option<String>,

    #[validate(length(max = 200, message = "Must be at most 200 characters"))]
    pub email: Option<String>,

    #[validate(length(max = 200, message = "Must be at most 200 characters"))]
    pub service: Option<String>,

    pub amount: Option<AmountInput>,

    #[validate(custom(function = "validate_status"))]
    pub status: Option<String>,
}

fn validate_payment_amount(request: &CreatePaymentRequest) -> Result<(), ValidationError> {
    match request.amount.as_ref().and_then(AmountInput::value) {
        Some(_) => Ok(()),
        None => {
            let mut err = ValidationError::new("invalid_amount");
            err.message = Some("Invalid amount".into());
            Err(err)
        }
    }
}

fn validate_status(status: &str) -> Result<(), ValidationError> {
    if status.trim().is_empty() || status.parse::<PaymentStatus>().is_ok() {
        Ok(())
    } else {
        let mut err = ValidationError::new("invalid_status");
        err.message = Some("Status must be one of PENDING, PAID, FAILED".into());
        Err(err)
    }
}

impl Submission for CreatePaymentRequest {
    type Record = PaymentRecord;

    fn into_record(self, stamp: RecordStamp) -> Result<PaymentRecord, ValidationErrors> {
        self.validate()?;

        // Both are Some/valid once validation passed.
        let amount = self
            .amount
            .as_ref()
            .and_then(AmountInput::value)
            .unwrap_or_default();
        let status = self
            .status
            .as_deref()
            .and_then(|s| s.parse::<PaymentStatus>().ok())
            .unwrap_or_default();

        Ok(PaymentRecord {
            id: stamp.id,
            created_at: stamp.created_at,
            name: trimmed_or_empty(self.name.as_deref()),
            phone: trimmed_or_empty(self.phone.as_deref()),
            email: trimmed_or_empty(self.email.as_deref()),
            amount,
            service: trimmed_or_empty(self.service.as_deref()),
            status,
        })
    }
}

impl PaymentRecord {
    /// Amount rendered with two decimals and the currency symbol.
    pub fn display_amount(&self) -> String {
        format!("{}{:.2}", CURRENCY_SYMBOL, self.amount)
    }
}

impl Record for PaymentRecord {
    const KIND: RecordKind = RecordKind::Payment;

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
            "amount": self.amount,
            "status": self.status,
        })
    }

    fn notification(&self) -> SubmissionNotification {
        let amount = self.display_amount();
        let status = self.status.to_string();
        let body = HtmlSummary::new("New Payment Received")
            .field("Name", &self.name)
            .field("Phone", &self.phone)
            .field("Email", &self.email)
            .field("Service", &self.service)
            .field("Amount", &amount)
            .field("Status", &status)
            .field("Payment ID", &self.id)
            .render();

        let service = if self.service.is_empty() {
            "-"
        } else {
            &self.service
        };

        SubmissionNotification {
            kind: RecordKind::Payment,
            record_id: self.id.clone(),
            subject: format!("Payment Recorded - {} ({})", amount, service),
            html: body,
        }
    }
}
