//! Error types for localreel-media.

use std::io;
use thiserror::Error;

/// Result type for localreel-media operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for localreel-media operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Reading a window from the source failed.
    #[error("Failed to read window at offset {offset}: {source}")]
    Read {
        offset: u64,
        #[source]
        source: io::Error,
    },

    /// The engine cannot decode this descriptor.
    #[error("Unsupported MIME type or codec: {0}")]
    Unsupported(String),

    /// Window length must be non-zero.
    #[error("Invalid window length: {0}")]
    InvalidWindow(u64),

    /// The buffer was used in a way its state does not allow.
    #[error("Invalid buffer state: {0}")]
    InvalidState(&'static str),

    /// The buffer went away before signalling.
    #[error("Playback buffer closed")]
    BufferClosed,

    /// The object URL was revoked or never existed.
    #[error("Unknown object URL: {0}")]
    UnknownObject(String),

    /// The engine reported a failure.
    #[error("Playback engine error: {0}")]
    Engine(String),
}

impl Error {
    /// Create an unsupported error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Create an engine error.
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }
}

impl From<Error> for localreel_common::Error {
    fn from(err: Error) -> Self {
        use localreel_common::Error as Common;
        match err {
            Error::Io(e) | Error::Read { source: e, .. } => Common::Io(e),
            Error::Unsupported(descriptor) => Common::UnsupportedFormat(descriptor),
            Error::InvalidWindow(len) => {
                Common::invalid_input(format!("window length must be non-zero, got {len}"))
            }
            other => Common::internal(other.to_string()),
        }
    }
}
