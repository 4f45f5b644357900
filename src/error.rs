//! Error types for the groupwall DNS filter.

use std::io;

use thiserror::Error;

use crate::blocklist::LoadError;

/// Main error type for groupwall operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("list loading error: {0}")]
    Load(#[from] LoadError),

    #[error("DNS protocol error: {0}")]
    Protocol(#[from] hickory_proto::ProtoError),

    #[error("resolver error: {0}")]
    Resolver(String),

    #[error("no next resolver configured in the pipeline")]
    NoNextResolver,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("metrics error: {0}")]
    Metrics(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[source] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Validation errors for configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown block type {value:?} (expected ZeroIP, NxDomain or an IP address)")]
    UnknownBlockType { value: String },

    #[error("blocking.block_ttl_seconds must be greater than 0")]
    ZeroBlockTtl,

    #[error("list group name cannot be empty")]
    EmptyGroupName,

    #[error("list group {group:?} has an empty source")]
    EmptySource { group: String },

    #[error("client identifier cannot be empty")]
    EmptyClientId,
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Self::Config(ConfigError::Validation(err))
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;
