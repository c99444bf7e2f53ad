//! Storage for uploads, generated artifacts and the paper catalogue

mod artifact_store;
mod local;

pub use artifact_store::ArtifactStore;
pub use local::LocalPaperStore;
