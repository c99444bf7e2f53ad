//! Storage provider trait used by the pipeline

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::Result;
use crate::types::ResultKind;

/// Trait for the storage the pipeline reads from and writes to
///
/// Implementations:
/// - `LocalPaperStore`: local filesystem
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Location of the uploaded source document
    fn source_path(&self, paper_id: &str) -> PathBuf;

    /// Whether the paper is known to the store
    async fn paper_exists(&self, paper_id: &str) -> Result<bool>;

    /// Persist the text chunks of a paper
    async fn persist_chunks(&self, paper_id: &str, chunks: &[String]) -> Result<()>;

    /// Persist one generated artifact
    async fn persist_artifact(&self, paper_id: &str, kind: ResultKind, content: &str) -> Result<()>;

    /// Read a summary template by name
    async fn read_template(&self, name: &str) -> Result<String>;

    /// Record that processing of the paper failed, so its partial
    /// artifacts are no longer served
    async fn mark_failed(&self, paper_id: &str) -> Result<()>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
