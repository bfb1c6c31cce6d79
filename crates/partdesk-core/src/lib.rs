//! Shared foundation for the partdesk workspace.
//!
//! Configuration, the top-level error type, and identifier normalization
//! used by every other crate.

pub mod config;
pub mod error;
pub mod normalize;

pub use config::PartdeskConfig;
pub use error::{PartdeskError, Result};
pub use normalize::{normalize, normalize_opt};

/// Install the global tracing subscriber.
///
/// Respects `RUST_LOG`; falls back to the given level. Later calls are
/// no-ops, so integration harnesses can call this unconditionally.
pub fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
