//! Shared plumbing for the allotax client binaries: input loading and
//! tracing setup.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::fs;
use std::path::Path;

use allotax::{ComparisonConfig, ElementRecord};
use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Reads one system from a JSON array of records.
///
/// Records use `category`/`count` or the legacy `types`/`counts` names.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not an array of
/// well-formed records.
pub fn load_system(path: &Path) -> Result<Vec<ElementRecord>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let records: Vec<ElementRecord> = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {} as a record array", path.display()))?;
    tracing::debug!(path = %path.display(), records = records.len(), "system loaded");
    Ok(records)
}

/// Loads a TOML configuration, or the defaults when no path is given.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> Result<ComparisonConfig> {
    match path {
        Some(path) => Ok(ComparisonConfig::load(path)?),
        None => Ok(ComparisonConfig::default()),
    }
}

/// Installs a stderr `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level is `debug` with `verbose`
/// and `warn` without.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "allotax=debug,allotax_clients=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A subscriber may already be installed (tests); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
