use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Task source error: {0}")]
    Source(String),

    #[error("Invalid export interval: {0} (must be between 1 and 1440 minutes)")]
    InvalidInterval(i64),

    #[error("Unknown phase: {0}")]
    UnknownPhase(String),

    #[error("Unknown business area: {0}")]
    UnknownBusinessArea(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
