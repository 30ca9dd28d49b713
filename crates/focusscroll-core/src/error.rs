//! Error types for registration, configuration and snapshot validation.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::BlockId;

/// Fatal at mount time: the engine refuses to start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActivationError {
    #[error("block set is empty")]
    EmptyBlockSet,

    #[error("duplicate block id {0}")]
    DuplicateBlockId(BlockId),

    #[error("block ids must be strictly increasing: {next} registered after {prev}")]
    NonMonotonicBlockIds { prev: BlockId, next: BlockId },

    #[error("invalid engine config: {0}")]
    InvalidConfig(String),
}

/// Recoverable per-cycle condition: the cycle is skipped and state retained.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SnapshotError {
    #[error("missing geometry for block {0}")]
    MissingGeometry(BlockId),

    #[error("non-finite value in snapshot field `{0}`")]
    NonFinite(String),

    #[error("viewport height must be positive, got {0}")]
    InvalidViewportHeight(f64),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Invalid(#[from] ActivationError),
}
