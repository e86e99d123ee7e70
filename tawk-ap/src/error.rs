//! Error types for tawk-ap
//!
//! Transport failures never escape the engine; they degrade to "not playing".
//! The variants below cover startup, the HTTP boundary and misuse after
//! teardown.

use thiserror::Error;

/// Main error type for tawk-ap
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors bubbled up from tawk-common (config discovery, feed parsing)
    #[error(transparent)]
    Common(#[from] tawk_common::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Audio backend failures (load, play, seek, release)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Command issued after `PlaybackEngine::shutdown()`
    #[error("Playback engine has been shut down")]
    EngineShutDown,

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),
}

/// Convenience Result type using tawk-ap Error
pub type Result<T> = std::result::Result<T, Error>;
