//! Record identity assignment.

use chrono::{DateTime, Duration, Utc};
use domain::models::{RecordKind, RecordStamp};
use std::sync::Mutex;
use uuid::Uuid;

/// Issues record ids and creation timestamps.
///
/// Timestamps strictly increase within one process, even if the wall clock
/// stalls or goes backwards: a stamp that would not pass the previous one is
/// moved one microsecond past it. File order only matches stamp order when
/// the stamp is taken while the target file is locked, as
/// [`crate::WriteThroughStore::persist`] does.
#[derive(Debug)]
pub struct RecordStamper {
    last: Mutex<DateTime<Utc>>,
}

impl Default for RecordStamper {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStamper {
    pub fn new() -> Self {
        Self {
            last: Mutex::new(DateTime::<Utc>::MIN_UTC),
        }
    }

    /// Stamps a new record of the given kind.
    pub fn stamp(&self, kind: RecordKind) -> RecordStamp {
        let now = Utc::now();
        let created_at = {
            let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
            *last = if now > *last {
                now
            } else {
                *last + Duration::microseconds(1)
            };
            *last
        };

        RecordStamp {
            id: format!("{}_{}", kind.id_prefix(), Uuid::new_v4().simple()),
            created_at,
        }
    }
}
