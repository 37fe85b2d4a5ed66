//! Write-through persistence.
//!
//! A submission is validated, stamped and appended to the local store while
//! that kind's file is locked, then offered to the upstream table. Stamping
//! under the lock keeps each local file in `createdAt` order. The local store
//! always holds a complete copy. An upstream failure is logged and absorbed;
//! a rejected submission or a local failure is returned to the caller.

use domain::models::{Record, Submission};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};
use validator::ValidationErrors;

use crate::local_store::{LocalStore, LocalStoreError};
use crate::metrics::record_persist;
use crate::stamp::RecordStamper;
use crate::upstream::SupabaseClient;

/// What happened when a record was offered to the upstream table.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOutcome {
    /// Upstream accepted the row. Carries the stored representation if one
    /// was returned.
    Stored { remote_row: Option<Value> },
    /// Upstream was configured but the insert failed.
    Failed(String),
    /// No upstream is configured.
    NotConfigured,
}

impl RemoteOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RemoteOutcome::Stored { .. } => "stored",
            RemoteOutcome::Failed(_) => "failed",
            RemoteOutcome::NotConfigured => "not_configured",
        }
    }

    pub fn is_stored(&self) -> bool {
        matches!(self, RemoteOutcome::Stored { .. })
    }
}

/// Result of persisting one record.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistOutcome {
    pub remote: RemoteOutcome,
    /// Rows in the local file after the append.
    pub local_count: usize,
}

/// Record accepted by [`WriteThroughStore::persist`].
#[derive(Debug, Clone, PartialEq)]
pub struct Persisted<R> {
    pub record: R,
    pub outcome: PersistOutcome,
}

/// Reasons a submission is not persisted.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Submission rejected: {0}")]
    Invalid(#[from] ValidationErrors),

    #[error(transparent)]
    Local(#[from] LocalStoreError),
}

/// Upstream table plus local mirror.
pub struct WriteThroughStore {
    upstream: Option<SupabaseClient>,
    local: LocalStore,
    stamper: RecordStamper,
}

impl WriteThroughStore {
    pub fn new(upstream: Option<SupabaseClient>, local: LocalStore) -> Self {
        Self {
            upstream,
            local,
            stamper: RecordStamper::new(),
        }
    }

    pub fn upstream(&self) -> Option<&SupabaseClient> {
        self.upstream.as_ref()
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    /// Validates a submission and persists the record it becomes: locally
    /// (required) and then upstream (best effort).
    pub async fn persist<S: Submission>(
        &self,
        request: S,
    ) -> Result<Persisted<S::Record>, PersistError> {
        let kind = <S::Record as Record>::KIND;

        let (record, local_count) = {
            let mut file = self.local.lock::<S::Record>().await;
            let record = request.into_record(self.stamper.stamp(kind))?;
            match file.append(&record).await {
                Ok(count) => (record, count),
                Err(e) => {
                    error!(
                        kind = %kind,
                        record_id = %record.id(),
                        error = %e,
                        "Local store append failed"
                    );
                    return Err(e.into());
                }
            }
        };

        let remote = self.insert_upstream(&record).await;

        record_persist(&kind.to_string(), remote.label());
        info!(
            kind = %kind,
            record_id = %record.id(),
            created_at = %record.created_at(),
            remote = remote.label(),
            local_count,
            "Record persisted"
        );

        Ok(Persisted {
            record,
            outcome: PersistOutcome {
                remote,
                local_count,
            },
        })
    }

    async fn insert_upstream<R: Record>(&self, record: &R) -> RemoteOutcome {
        let Some(client) = &self.upstream else {
            return RemoteOutcome::NotConfigured;
        };

        match client.insert(R::KIND.table(), &record.upstream_row()).await {
            Ok(remote_row) => RemoteOutcome::Stored { remote_row },
            Err(e) => {
                warn!(
                    kind = %R::KIND,
                    record_id = %record.id(),
                    error = %e,
                    timeout = e.is_timeout(),
                    "Upstream insert failed, keeping local copy only"
                );
                RemoteOutcome::Failed(e.to_string())
            }
        }
    }
}
