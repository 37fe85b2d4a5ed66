//! Persistence layer for the Consult Desk backend.
//!
//! This crate contains:
//! - The upstream table client (Supabase REST)
//! - The local JSON file store
//! - Record stamping and the write-through store combining both

pub mod local_store;
pub mod metrics;
pub mod stamp;
pub mod upstream;
pub mod write_through;

pub use local_store::{LocalStore, LocalStoreError, StoreFileGuard};
pub use stamp::RecordStamper;
pub use upstream::{SelectQuery, SupabaseClient, UpstreamConfig, UpstreamError};
pub use write_through::{
    PersistError, PersistOutcome, Persisted, RemoteOutcome, WriteThroughStore,
};
