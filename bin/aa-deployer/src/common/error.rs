use std::path::PathBuf;

use aa_deploy::{DeployError, SequenceError};
use alloy_primitives::hex::FromHexError;

/// Error types for the aa-deployer commands
#[derive(Debug, thiserror::Error)]
pub enum DeployerError {
    /// Deployment error outside of a pipeline
    #[error(transparent)]
    Deploy(#[from] DeployError),

    /// Pipeline aborted on a step
    #[error(transparent)]
    Sequence(#[from] SequenceError),

    /// Failed to read or write a file
    #[error("Failed to access {}: {source}", path.display())]
    Io {
        /// The file
        path: PathBuf,
        /// The underlying error
        source: std::io::Error,
    },

    /// Malformed JSON file
    #[error("Invalid JSON in {}: {source}", path.display())]
    Json {
        /// The file
        path: PathBuf,
        /// The underlying error
        source: serde_json::Error,
    },

    /// Artifact not found
    #[error("Artifact `{name}` not found under {}", dir.display())]
    ArtifactNotFound {
        /// Contract name
        name: String,
        /// Searched directory
        dir: PathBuf,
    },

    /// Invalid hex string
    #[error("Invalid hex string: {0}")]
    InvalidHex(#[from] FromHexError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl DeployerError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }

    pub(crate) fn json(path: impl Into<PathBuf>) -> impl FnOnce(serde_json::Error) -> Self {
        let path = path.into();
        move |source| Self::Json { path, source }
    }
}

/// Result type for the aa-deployer commands
pub type Result<T> = std::result::Result<T, DeployerError>;
