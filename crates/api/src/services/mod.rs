//! Application services.

pub mod notifier;

pub use notifier::{spawn_notify, Notifier, NotifyError};
