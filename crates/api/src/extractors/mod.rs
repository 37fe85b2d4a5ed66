//! Custom Axum extractors.

pub mod submission;

pub use submission::SubmissionBody;
