//! Error types for the blocklist generator.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::blocklist::{AllowListError, FetchError};
use crate::lock::LockError;
use crate::service::CommandError;
use crate::writer::WriterError;

/// Main error type for a blocklist run.
///
/// Every variant is fatal: the run stops, the staged file is removed and the
/// resolver is left alone. Malformed zones in a deny-list are not errors at
/// this level, they are logged and skipped by the extractor.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("run lock error: {0}")]
    Lock(#[from] LockError),

    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("allow-list error: {0}")]
    AllowList(#[from] AllowListError),

    #[error("staging error: {0}")]
    Stage(#[from] WriterError),

    #[error("configuration check failed: {0}")]
    Validation(#[source] CommandError),

    #[error("resolver reload failed: {0}")]
    Reload(#[source] CommandError),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Validation errors for configuration values.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("allow_patterns_url cannot be empty")]
    EmptyAllowPatternsUrl,

    #[error("deny_hosts_urls must list at least one source")]
    NoDenySources,

    #[error("invalid URL (must start with http:// or https://): {url:?}")]
    InvalidUrl { url: String },

    #[error("config_path must name a file: {path:?}")]
    InvalidConfigPath { path: PathBuf },

    #[error("command cannot be empty")]
    EmptyCommand,

    #[error("file_mode must be a permission mode no larger than 0o7777, got {mode:#o}")]
    InvalidFileMode { mode: u32 },
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;
