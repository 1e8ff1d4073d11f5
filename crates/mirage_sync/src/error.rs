//! # Sync Error Types
//!
//! The frame loop never fails; only loading configuration can.

use thiserror::Error;

/// Errors raised while building a [`Sampler`](crate::Sampler).
#[derive(Error, Debug)]
pub enum SyncError {
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration file is not valid TOML for [`SyncConfig`](crate::SyncConfig).
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),
}

/// Result type for sync setup operations.
pub type SyncResult<T> = Result<T, SyncError>;
