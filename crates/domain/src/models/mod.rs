//! Domain models for Consult Desk.
//!
//! Every submission kind follows the same lifecycle: a request payload is
//! validated, stamped with an id and creation time, and becomes an immutable
//! record.

pub mod booking;
pub mod enquiry;
pub mod payment;

pub use booking::{Booking, CreateBookingRequest};
pub use enquiry::{CreateEnquiryRequest, Enquiry};
pub use payment::{AmountInput, CreatePaymentRequest, PaymentRecord, PaymentStatus};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationErrors};

use crate::services::notification::SubmissionNotification;

/// The kinds of record the system accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Booking,
    Enquiry,
    Payment,
}

impl RecordKind {
    /// All record kinds, in display order.
    pub const ALL: [RecordKind; 3] = [RecordKind::Booking, RecordKind::Enquiry, RecordKind::Payment];

    /// Upstream table name, also used for the local file and CSV export names.
    pub fn table(&self) -> &'static str {
        match self {
            RecordKind::Booking => "bookings",
            RecordKind::Enquiry => "enquiries",
            RecordKind::Payment => "payments",
        }
    }

    /// Prefix of generated record ids.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            RecordKind::Booking => "bk",
            RecordKind::Enquiry => "enq",
            RecordKind::Payment => "pay",
        }
    }

    /// Column order for CSV exports. Names match the serialized record keys.
    pub fn csv_columns(&self) -> &'static [&'static str] {
        match self {
            RecordKind::Booking => &[
                "id",
                "createdAt",
                "name",
                "phone",
                "email",
                "service",
                "date",
                "time",
                "message",
            ],
            RecordKind::Enquiry => &["id", "createdAt", "name", "phone", "email", "message"],
            RecordKind::Payment => &[
                "id",
                "createdAt",
                "name",
                "phone",
                "email",
                "amount",
                "service",
                "status",
            ],
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Booking => write!(f, "booking"),
            RecordKind::Enquiry => write!(f, "enquiry"),
            RecordKind::Payment => write!(f, "payment"),
        }
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "booking" | "bookings" => Ok(RecordKind::Booking),
            "enquiry" | "enquiries" => Ok(RecordKind::Enquiry),
            "payment" | "payments" => Ok(RecordKind::Payment),
            _ => Err(format!("Unknown record kind: {}", s)),
        }
    }
}

/// Identity assigned to a record at the moment it is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordStamp {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// An accepted, immutable record.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: RecordKind;

    fn id(&self) -> &str;

    fn created_at(&self) -> DateTime<Utc>;

    /// Row sent to the upstream table: snake_case columns, no local id.
    fn upstream_row(&self) -> serde_json::Value;

    /// Notification announcing this record.
    fn notification(&self) -> SubmissionNotification;
}

/// A validated request payload that turns into a record.
pub trait Submission: Validate + DeserializeOwned + Send + 'static {
    type Record: Record;

    /// Validates the payload and builds the record under the given stamp.
    fn into_record(self, stamp: RecordStamp) -> Result<Self::Record, ValidationErrors>;
}

/// Maps an empty string to JSON null for optional upstream columns.
pub(crate) fn null_if_empty(value: &str) -> serde_json::Value {
    if value.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::Value::String(value.to_string())
    }
}
