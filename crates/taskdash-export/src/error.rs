use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Store client unavailable")]
    StoreUnavailable,

    #[error("Unknown artifact format: {0}")]
    UnknownFormat(String),

    #[error(transparent)]
    Store(#[from] taskdash_store::Error),

    #[error(transparent)]
    Domain(#[from] taskdash_core::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
