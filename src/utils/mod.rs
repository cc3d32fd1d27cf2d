//! Utility modules

pub mod logger;
pub mod metrics;
pub mod notifier;

pub use notifier::Notifier;
