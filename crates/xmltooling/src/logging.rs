//! Logging setup
//!
//! Libraries in the workspace only emit `tracing` events; binaries call
//! [`init_logging`] once at startup.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::{Config, Error};

/// Install a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `config.log_filter`
pub fn init_logging(config: &Config) -> Result<(), Error> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => filter_for(&config.log_filter)?,
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;
    tracing::debug!(filter = %config.log_filter, "logging initialized");
    Ok(())
}

fn filter_for(directive: &str) -> Result<EnvFilter, Error> {
    EnvFilter::try_new(directive).map_err(|source| Error::LogFilter {
        filter: directive.to_string(),
        source,
    })
}
