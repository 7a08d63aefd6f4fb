//! Error types for the chat system.

use thiserror::Error;

/// Result type for chat operations
pub type ChatResult<T> = Result<T, ChatError>;

/// Chat system errors
#[derive(Error, Debug)]
pub enum ChatError {
    /// Network or backend failure while completing or streaming
    #[error("Backend error: {0}")]
    Backend(String),

    /// Hosted backend selected without a credential
    #[error("Hosted backend not configured. Set OPENAI_API_KEY")]
    LlmNotConfigured,

    /// Transcript data that is not a valid transcript collection
    #[error("Transcript format error: {0}")]
    Format(String),

    /// Load requested without any file contents
    #[error("No file was uploaded.")]
    MissingInput,

    /// Save target that is not a bare file name
    #[error("Invalid conversation file name: {0:?}")]
    InvalidFilename(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        Self::Backend(format!("Network error: {}", err))
    }
}
