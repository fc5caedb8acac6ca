//! Error types for the Scribe STT client

use thiserror::Error;

/// Result type alias for STT operations
pub type SttResult<T> = Result<T, SttError>;

/// Errors that can occur while talking to a transcription provider
#[derive(Error, Debug)]
pub enum SttError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
