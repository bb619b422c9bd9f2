pub mod error;
pub mod models;
pub mod password;
pub mod repository;

// Re-exports
pub use error::{Error, Result};
pub use models::{TaskRow, User, UserRow};
pub use repository::Database;
