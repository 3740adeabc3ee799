#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Subscriber setup for the generator.
//!
//! Library crates only emit `tracing` events. Binaries call [`init`] once to
//! route them to stderr or a log file.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Environment variable whose filter directives replace the configured level
pub const LOG_ENV: &str = "TRIPLEGATE_LOG";

/// Errors raised while installing the subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The level is not a valid filter directive
    #[error("invalid log filter {directive:?}: {source}")]
    Filter {
        /// Rejected directive
        directive: String,
        /// Parser error
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    /// The log file could not be opened
    #[error("failed to open log file: {0}")]
    File(#[from] std::io::Error),
    /// A global subscriber is already installed
    #[error(transparent)]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}

/// Filter built from `TRIPLEGATE_LOG` if set, otherwise from `level`
pub fn filter(level: &str) -> Result<EnvFilter, LoggingError> {
    let directive = std::env::var(LOG_ENV).ok().filter(|v| !v.trim().is_empty()).unwrap_or_else(|| level.to_string());
    EnvFilter::try_new(&directive).map_err(|source| LoggingError::Filter { directive, source })
}

/// Install the global subscriber.
///
/// Events go to `file` when given (appending), otherwise to stderr.
pub fn init(level: &str, file: Option<&Path>) -> Result<(), LoggingError> {
    let filter = filter(level)?;
    let registry = tracing_subscriber::registry().with(filter);
    match file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            registry.with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(Mutex::new(file))).try_init()?;
        }
        None => registry.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)).try_init()?,
    }
    tracing::debug!(level, "logging initialised");
    Ok(())
}
