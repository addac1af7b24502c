//! Error types for the diff engine.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type for diff engine operations
pub type DiffResult<T> = Result<T, DiffError>;

/// Errors that stop a single pair (or, for the output directory, the whole run)
#[derive(Debug, Error)]
pub enum DiffError {
    /// Source image missing, unreadable or undecodable
    #[error("failed to load image {}: {source}", path.display())]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Normalization could not produce equal-shaped rasters
    #[error("cannot normalize images of size {old_width}x{old_height} and {new_width}x{new_height}")]
    DimensionMismatch {
        old_width: u32,
        old_height: u32,
        new_width: u32,
        new_height: u32,
    },

    /// Output directory or artifact could not be written
    #[error("failed to write {}: {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Structural comparison rejected the pair
    #[error("structural comparison failed: {0}")]
    Compare(String),

    /// Annotated image could not be encoded
    #[error("failed to encode annotated image: {0}")]
    Encode(#[from] image::ImageError),

    /// Report could not be serialized
    #[error("failed to serialize verdict: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Directory listing failed
    #[error("failed to read directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A pipeline task panicked or was aborted
    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl DiffError {
    pub(crate) fn output_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::OutputWrite {
            path: path.into(),
            source,
        }
    }
}

/// Reasons a narration could not be obtained. Never fatal for a pair.
#[derive(Debug, Error)]
pub enum NarrationError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned an error status
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// Provider answered with something we could not read
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Provider did not answer in time
    #[error("narration timed out after {0:?}")]
    Timeout(Duration),

    /// Provider needs a key that was not configured
    #[error("missing API key ({0})")]
    MissingApiKey(&'static str),

    /// Source image bytes could not be read
    #[error("failed to read image for narration: {0}")]
    Io(#[from] std::io::Error),
}
