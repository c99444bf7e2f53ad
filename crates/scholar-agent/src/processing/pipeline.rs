//! Paper pipeline orchestrator
//!
//! Drives one task through parsing, translating, summarizing and critiquing.
//! Every transition goes through the registry before the next stage starts,
//! so subscribers see each stage as it begins. Stage bodies run on the
//! blocking thread pool and never touch the registry themselves.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::registry::TaskRegistry;
use crate::config::{ScholarConfig, UnreadableInputPolicy};
use crate::error::{Error, Result};
use crate::generation::{infer_domain_tags, ArtifactBuilder};
use crate::ingestion::{TextChunker, TextExtractor, PLACEHOLDER_TEXT};
use crate::storage::ArtifactStore;
use crate::types::{ResultKind, TaskStatus};

/// Parameters for one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub task_id: String,
    pub paper_id: String,
    /// Title used in generated documents
    pub title: String,
    pub target_language: String,
    /// Summary template file name
    pub template_name: String,
}

/// How a pipeline run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// All stages finished; carries the inferred domain tags
    Completed { tags: Vec<String> },
    /// A stage failed and the task was marked `failed`
    Failed { stage: TaskStatus, error: String },
}

/// Orchestrates the stage functions for a task and reports progress
pub struct PaperPipeline {
    registry: TaskRegistry,
    store: Arc<dyn ArtifactStore>,
    extractor: Arc<dyn TextExtractor>,
    chunker: TextChunker,
    unreadable_input: UnreadableInputPolicy,
    stage_pause: Duration,
}

impl PaperPipeline {
    /// Create a pipeline with chunking and pacing taken from the config
    pub fn new(
        registry: TaskRegistry,
        store: Arc<dyn ArtifactStore>,
        extractor: Arc<dyn TextExtractor>,
        config: &ScholarConfig,
    ) -> Self {
        Self {
            registry,
            store,
            extractor,
            chunker: TextChunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap),
            unreadable_input: config.pipeline.unreadable_input,
            stage_pause: config.pipeline.stage_pause(),
        }
    }

    /// Override the pause inserted after each stage
    pub fn with_stage_pause(mut self, pause: Duration) -> Self {
        self.stage_pause = pause;
        self
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Register the task and run the pipeline in the background.
    ///
    /// The task is visible in the registry as `queued` when this returns.
    pub fn submit(self: &Arc<Self>, request: PipelineRequest) -> Result<JoinHandle<PipelineOutcome>> {
        self.registry.create(&request.task_id, &request.paper_id)?;

        let pipeline = Arc::clone(self);
        Ok(tokio::spawn(async move { pipeline.run(&request).await }))
    }

    /// Run every stage for an already registered task.
    ///
    /// Failures never escape: the paper is marked failed in the store, then
    /// the task is moved to `failed` with the error as its message and keeps
    /// the progress it had reached.
    pub async fn run(&self, request: &PipelineRequest) -> PipelineOutcome {
        tracing::info!(
            "Starting pipeline for task {} (paper {}, extractor: {}, store: {})",
            request.task_id,
            request.paper_id,
            self.extractor.name(),
            self.store.name()
        );

        match self.execute(request).await {
            Ok(tags) => {
                tracing::info!("Task {} completed with tags {:?}", request.task_id, tags);
                PipelineOutcome::Completed { tags }
            }
            Err(e) => {
                let current = self.registry.get(&request.task_id);
                let stage = current
                    .as_ref()
                    .map(|t| t.status)
                    .unwrap_or(TaskStatus::Queued);
                let progress = current.map(|t| t.progress).unwrap_or(0);

                tracing::error!("Task {} failed during {}: {}", request.task_id, stage, e);
                // Readers reacting to the failed snapshot must already see the paper as failed
                if let Err(store_err) = self.store.mark_failed(&request.paper_id).await {
                    tracing::error!(
                        "Failed to record failure of paper {}: {}",
                        request.paper_id,
                        store_err
                    );
                }
                self.registry.update(
                    &request.task_id,
                    TaskStatus::Failed,
                    progress,
                    format!("Task failed: {}", e),
                );

                PipelineOutcome::Failed {
                    stage,
                    error: e.to_string(),
                }
            }
        }
    }

    async fn execute(&self, request: &PipelineRequest) -> Result<Vec<String>> {
        let paper_id = request.paper_id.as_str();

        self.transition(request, TaskStatus::Parsing, "Parsing PDF text.");
        let source = self.store.source_path(paper_id);
        let extractor = Arc::clone(&self.extractor);
        let policy = self.unreadable_input;
        let text = run_stage(TaskStatus::Parsing, move || {
            extract_with_policy(extractor.as_ref(), &source, policy)
        })
        .await?;

        let chunker = self.chunker.clone();
        let chunk_input = text.clone();
        let chunks = run_stage(TaskStatus::Parsing, move || Ok(chunker.chunk(&chunk_input))).await?;
        tracing::debug!("Paper {} split into {} chunks", paper_id, chunks.len());
        self.store
            .persist_chunks(paper_id, &chunks)
            .await
            .map_err(|e| stage_error(TaskStatus::Parsing, e))?;
        self.pause().await;

        let chunks = Arc::new(chunks);

        self.transition(request, TaskStatus::Translating, "Generating full translation.");
        let translation = {
            let chunks = Arc::clone(&chunks);
            let title = request.title.clone();
            let language = request.target_language.clone();
            run_stage(TaskStatus::Translating, move || {
                Ok(ArtifactBuilder::translation(&title, &language, &chunks))
            })
            .await?
        };
        self.persist(TaskStatus::Translating, paper_id, ResultKind::Translation, &translation)
            .await?;
        self.pause().await;

        self.transition(request, TaskStatus::Summarizing, "Writing template-based summary.");
        let template = self
            .store
            .read_template(&request.template_name)
            .await
            .map_err(|e| stage_error(TaskStatus::Summarizing, e))?;
        let summary = {
            let chunks = Arc::clone(&chunks);
            let title = request.title.clone();
            run_stage(TaskStatus::Summarizing, move || {
                Ok(ArtifactBuilder::summary(&title, &template, &chunks))
            })
            .await?
        };
        self.persist(TaskStatus::Summarizing, paper_id, ResultKind::Summary, &summary)
            .await?;
        self.pause().await;

        self.transition(request, TaskStatus::Critiquing, "Generating improvement suggestions.");
        let (tags, improvement) = {
            let chunks = Arc::clone(&chunks);
            let title = request.title.clone();
            run_stage(TaskStatus::Critiquing, move || {
                let tags = infer_domain_tags(&text);
                let improvement = ArtifactBuilder::improvement(&title, &tags, &chunks);
                Ok((tags, improvement))
            })
            .await?
        };
        self.persist(TaskStatus::Critiquing, paper_id, ResultKind::Improvement, &improvement)
            .await?;
        self.pause().await;

        self.transition(request, TaskStatus::Done, "Task completed.");
        Ok(tags)
    }

    fn transition(&self, request: &PipelineRequest, status: TaskStatus, message: &str) {
        let progress = status.progress().unwrap_or(0);
        self.registry
            .update(&request.task_id, status, progress, message);
    }

    async fn persist(
        &self,
        stage: TaskStatus,
        paper_id: &str,
        kind: ResultKind,
        content: &str,
    ) -> Result<()> {
        self.store
            .persist_artifact(paper_id, kind, content)
            .await
            .map_err(|e| stage_error(stage, e))
    }

    async fn pause(&self) {
        if !self.stage_pause.is_zero() {
            tokio::time::sleep(self.stage_pause).await;
        }
    }
}

/// Run a synchronous stage body on the blocking pool
async fn run_stage<T, F>(stage: TaskStatus, body: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(body)
        .await
        .map_err(|e| stage_error(stage, Error::from(e)))?
        .map_err(|e| stage_error(stage, e))
}

fn stage_error(stage: TaskStatus, err: Error) -> Error {
    match err {
        Error::StageExecution { .. } => err,
        other => Error::stage(stage.as_str(), other.to_string()),
    }
}

/// Extract text, applying the unreadable-input policy to failures and empty text
fn extract_with_policy(
    extractor: &dyn TextExtractor,
    path: &Path,
    policy: UnreadableInputPolicy,
) -> Result<String> {
    let failure = match extractor.extract(path) {
        Ok(text) if !text.trim().is_empty() => return Ok(text),
        Ok(_) => Error::extraction(path.display().to_string(), "no text found"),
        Err(e) => e,
    };

    match policy {
        UnreadableInputPolicy::Placeholder => {
            tracing::warn!("{}; continuing with placeholder text", failure);
            Ok(PLACEHOLDER_TEXT.to_string())
        }
        UnreadableInputPolicy::Fail => Err(failure),
    }
}
