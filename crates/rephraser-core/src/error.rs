//! Error types for the rephraser core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Model load failed: {0}")]
    ModelLoadError(String),

    #[error("Tokenization failed: {0}")]
    TokenizationError(String),

    #[error("Generation failed: {0}")]
    GenerationError(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("HuggingFace Hub error: {0}")]
    HfHubError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigError(#[from] serde_json::Error),
}

impl From<candle_core::Error> for Error {
    fn from(err: candle_core::Error) -> Self {
        Error::GenerationError(err.to_string())
    }
}
