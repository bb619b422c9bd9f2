pub mod drive;
pub mod error;
pub mod s3;
pub mod store;

mod sigv4;

// Re-exports
pub use drive::{DriveConfig, DriveStore};
pub use error::{Error, Result};
pub use s3::{S3Config, S3Store};
pub use store::{ObjectStore, StoredObject};
