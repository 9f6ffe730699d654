//! Error types for map capture and booklet export

use thiserror::Error;

/// Result type alias for mapbook operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while capturing the map or producing the booklet
#[derive(Error, Debug)]
pub enum Error {
    /// Export was requested before the map view was mounted
    #[error("Map view is not mounted; nothing to export")]
    ViewNotMounted,

    /// Failed to rasterize the map view
    #[error("Capture failed: {0}")]
    CaptureError(String),

    /// A picture referenced by a description could not be loaded or decoded
    #[error("Failed to embed image {url}: {reason}")]
    ImageEmbedError { url: String, reason: String },

    /// Failed to assemble or serialize the document
    #[error("Document error: {0}")]
    DocumentError(String),

    /// Network error while fetching a remote resource
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Another export is still running on the same exporter
    #[error("An export is already in progress")]
    ExportInProgress,

    /// Filesystem error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn image(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::ImageEmbedError {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ConfigError(err.to_string())
    }
}
