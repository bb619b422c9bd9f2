use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Store not configured: {0}")]
    NotConfigured(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed list response: {0}")]
    BadListResponse(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
