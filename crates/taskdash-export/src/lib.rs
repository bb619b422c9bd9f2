pub mod error;
pub mod scheduler;

// Re-exports
pub use error::{Error, Result};
pub use scheduler::{
    ArtifactFormat, Exporter, ExportStatus, OpOutcome, RenderedArtifact,
};
