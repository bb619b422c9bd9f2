use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Task not found: {0}")]
    TaskNotFound(i64),

    #[error("User not found: {0}")]
    UserNotFound(i64),

    #[error("Username already exists: {0}")]
    DuplicateUsername(String),

    #[error("Invalid stored value: {0}")]
    InvalidValue(String),

    #[error("Invalid password hash format")]
    BadPasswordHash,

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Domain(#[from] taskdash_core::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
