//! Common error types used throughout localreel.
//!
//! Every failure the core can report maps onto one of these variants. The
//! binary converts them into status messages; nothing here is retried.

use std::path::PathBuf;

/// Common error type for localreel.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No directory has been selected or authorized.
    #[error("No directory handle available")]
    NoCapability,

    /// The user declined or cancelled the directory chooser.
    #[error("Failed to get directory access")]
    RequestDenied,

    /// The persistence layer could not be reached or failed mid-operation.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The playback engine cannot decode the descriptor.
    #[error("Unsupported video format: {0}")]
    UnsupportedFormat(String),

    /// Reading a media file failed.
    #[error("Failed to read {path:?}: {source}")]
    ReadFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The caller selected an entry that is not in the listing.
    #[error("Invalid video index: {index} (listing has {len} entries)")]
    InvalidIndex { index: usize, len: usize },

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new StorageUnavailable error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::StorageUnavailable(msg.into())
    }

    /// Create a new UnsupportedFormat error.
    pub fn unsupported_format<S: Into<String>>(descriptor: S) -> Self {
        Self::UnsupportedFormat(descriptor.into())
    }

    /// Create a new ReadFailure error for `path`.
    pub fn read_failure(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFailure {
            path: path.into(),
            source,
        }
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the caller should fall back to asking the user for a directory.
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::NoCapability.to_string(),
            "No directory handle available"
        );
        assert_eq!(
            Error::RequestDenied.to_string(),
            "Failed to get directory access"
        );

        let err = Error::storage("disk full");
        assert_eq!(err.to_string(), "Storage unavailable: disk full");

        let err = Error::unsupported_format("video/x-foo");
        assert_eq!(err.to_string(), "Unsupported video format: video/x-foo");

        let err = Error::InvalidIndex { index: 5, len: 3 };
        assert_eq!(
            err.to_string(),
            "Invalid video index: 5 (listing has 3 entries)"
        );
    }

    #[test]
    fn test_read_failure_keeps_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        let err = Error::read_failure("/videos/a.mp4", io_err);
        assert!(err.to_string().contains("a.mp4"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_is_storage_unavailable() {
        assert!(Error::storage("x").is_storage_unavailable());
        assert!(!Error::RequestDenied.is_storage_unavailable());
    }
}
