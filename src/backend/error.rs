use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while discovering backends.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("No backends provided")]
    Empty,

    #[error("Backend URL '{address}' is not valid: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to read backends file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build registry client: {0}")]
    ClientInit(#[source] reqwest::Error),

    #[error("Registry lookup for service '{service}' failed: {source}")]
    Registry {
        service: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Registry returned {status} for service '{service}'")]
    RegistryStatus { service: String, status: u16 },
}
