//! Client-side persistence and consistency layer for the coach tracker.
//!
//! Collections edited in the UI are pushed to the remote key/value store by
//! the [`Reconciler`](sync::Reconciler) through the
//! [`StorageGateway`](services::StorageGateway), phone inputs are checked
//! for uniqueness without flooding the API, and destructive actions are
//! recorded in the audit trail before they happen.

pub mod config;
pub mod error;
pub mod services;
pub mod session;
pub mod sync;
pub mod validation;

#[cfg(test)]
mod test_utils;

pub use config::ClientConfig;
pub use error::{ApiError, ConfigError, StorageError, StorageResult};
pub use session::ClientSession;

use tracing_subscriber::EnvFilter;

/// Install a `RUST_LOG`-driven fmt subscriber. Does nothing if one is already set.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
