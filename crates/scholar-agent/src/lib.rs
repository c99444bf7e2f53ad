//! scholar-agent: paper reading pipeline with live task progress
//!
//! Uploaded PDFs are parsed, chunked and turned into translation, summary and
//! improvement drafts by a background pipeline. Every task's progress is kept
//! in an in-memory registry and streamed to any number of subscribers over
//! server-sent events.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod processing;
pub mod server;
pub mod storage;
pub mod types;

pub use config::ScholarConfig;
pub use error::{Error, Result};
pub use processing::{PaperPipeline, PipelineOutcome, PipelineRequest, Subscription, TaskRegistry};
pub use types::{PaperMeta, PaperStatus, ResultKind, TaskSnapshot, TaskStatus};
