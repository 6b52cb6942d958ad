use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Unsupported service scheme: {0}")]
    UnsupportedService(String),
    #[error("Missing or invalid configuration: {0}")]
    MissingConfig(String),
    #[error("Invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("Serde error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("An internal error occurred: {0}")]
    InternalError(#[from] AnyhowError),
}
