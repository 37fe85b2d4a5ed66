//! Shared utilities and common types for the Consult Desk backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Secret comparison for admin credentials
//! - Common validation logic (blank checks, amount parsing)

pub mod crypto;
pub mod validation;
