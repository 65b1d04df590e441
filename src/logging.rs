//! Agent diagnostic logging
//!
//! The tracing core logs its own behavior (propagation copies, swallowed
//! lifecycle errors) through the `tracing` macros; this sets up the
//! subscriber for hosts that embed the agent standalone. Span export is a
//! separate concern and not wired here.

use tracing_subscriber::EnvFilter;

/// Initialize a fmt subscriber with environment-based filtering.
///
/// Safe to call more than once; later calls keep the first subscriber.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| e.to_string().into())
}

/// JSON-formatted variant for log pipelines
pub fn init_json() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| e.to_string().into())
}
