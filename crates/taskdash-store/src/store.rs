use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// One previously uploaded export, as reported by `list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredObject {
    pub key: String,
    pub size: u64,
    pub last_modified: String,
    pub url: String,
}

/// Remote destination for export artifacts. Two interchangeable
/// implementations exist; the export scheduler only ever talks through this
/// surface.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short provider tag for logs and filenames ("s3", "drive").
    fn provider(&self) -> &'static str;

    /// The bucket name or folder id uploads land in.
    fn destination(&self) -> String;

    /// Store a named blob. At-least-once: callers may retry and overwrite.
    async fn upload(&self, content: &str, key: &str, content_type: &str) -> Result<()>;

    /// Recent uploads, newest first, at most `limit` entries.
    async fn list(&self, prefix: &str, limit: usize) -> Result<Vec<StoredObject>>;

    /// Probe the destination for reachability.
    async fn health_check(&self) -> Result<()>;
}
