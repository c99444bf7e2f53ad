//! Application state for the scholar server

use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::ScholarConfig;
use crate::error::Result;
use crate::ingestion::{PdfParser, TextExtractor};
use crate::processing::{PaperPipeline, PipelineOutcome, PipelineRequest, TaskRegistry};
use crate::storage::{ArtifactStore, LocalPaperStore};
use crate::types::{PaperMeta, PaperStatus, TaskStatus};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: ScholarConfig,
    /// Paper catalogue and artifact storage
    store: Arc<LocalPaperStore>,
    /// Live task snapshots and subscribers
    registry: TaskRegistry,
    /// Orchestrator shared by all tasks
    pipeline: Arc<PaperPipeline>,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Create application state with the PDF extractor
    pub fn new(config: ScholarConfig) -> Result<Self> {
        Self::with_extractor(config, Arc::new(PdfParser::new()))
    }

    /// Create application state with a custom text extractor
    pub fn with_extractor(config: ScholarConfig, extractor: Arc<dyn TextExtractor>) -> Result<Self> {
        tracing::info!("Initializing scholar application state...");

        let store = Arc::new(LocalPaperStore::new(
            &config.storage.data_dir,
            &config.storage.templates_dir,
            config.storage.default_template.clone(),
        )?);
        tracing::info!(
            "Paper store initialized at {} (templates: {})",
            config.storage.data_dir.display(),
            config.storage.templates_dir.display()
        );

        let registry = TaskRegistry::new();
        let pipeline = Arc::new(PaperPipeline::new(
            registry.clone(),
            store.clone(),
            extractor,
            &config,
        ));
        tracing::info!(
            "Pipeline initialized (unreadable input: {:?}, keep-alive: {}s)",
            config.pipeline.unreadable_input,
            config.pipeline.keep_alive_secs
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                registry,
                pipeline,
                ready: RwLock::new(true),
            }),
        })
    }

    /// Get configuration
    pub fn config(&self) -> &ScholarConfig {
        &self.inner.config
    }

    /// Get the paper store
    pub fn store(&self) -> &Arc<LocalPaperStore> {
        &self.inner.store
    }

    /// Get the task registry
    pub fn registry(&self) -> &TaskRegistry {
        &self.inner.registry
    }

    /// Check if the server is ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }

    /// Start processing a catalogued paper and return the new task id.
    ///
    /// The paper's catalogue status follows the pipeline outcome. Failures
    /// are recorded before the `failed` snapshot is published.
    pub fn start_pipeline(&self, paper: &PaperMeta, template_name: &str) -> Result<String> {
        let task_id = Uuid::new_v4().simple().to_string();
        let request = PipelineRequest {
            task_id: task_id.clone(),
            paper_id: paper.paper_id.clone(),
            title: paper.title.clone(),
            target_language: paper.target_language.clone(),
            template_name: template_name.to_string(),
        };

        let handle = self.inner.pipeline.submit(request)?;

        let store = self.inner.store.clone();
        let registry = self.inner.registry.clone();
        let paper_id = paper.paper_id.clone();
        let watched_task = task_id.clone();
        tokio::spawn(async move {
            match handle.await {
                Ok(PipelineOutcome::Completed { tags }) => {
                    if let Err(e) = store
                        .update_paper_status(&paper_id, PaperStatus::Completed, Some(tags))
                        .await
                    {
                        tracing::error!("Failed to record completion of paper {}: {}", paper_id, e);
                    }
                }
                // The pipeline records the paper as failed before publishing
                Ok(PipelineOutcome::Failed { .. }) => {}
                Err(e) => {
                    tracing::error!("Pipeline for task {} aborted: {}", watched_task, e);
                    if let Err(store_err) = store.mark_failed(&paper_id).await {
                        tracing::error!("Failed to record failure of paper {}: {}", paper_id, store_err);
                    }
                    let progress = registry.get(&watched_task).map(|t| t.progress).unwrap_or(0);
                    registry.update(
                        &watched_task,
                        TaskStatus::Failed,
                        progress,
                        format!("Task failed: {}", e),
                    );
                }
            }
        });

        Ok(task_id)
    }
}
