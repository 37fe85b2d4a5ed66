//! Domain layer for the Consult Desk backend.
//!
//! This crate contains:
//! - Record models (Booking, Enquiry, PaymentRecord) and their request payloads
//! - The notification message model and service trait

pub mod models;
pub mod services;
