//! Paper catalogue types

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

/// Processing state of an uploaded paper
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaperStatus {
    Processing,
    Completed,
    Failed,
}

/// Kinds of generated artifact
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Translation,
    Summary,
    Improvement,
}

impl ResultKind {
    pub const ALL: [ResultKind; 3] = [
        ResultKind::Translation,
        ResultKind::Summary,
        ResultKind::Improvement,
    ];

    /// File name of the artifact inside the paper's output directory
    pub fn file_name(self) -> &'static str {
        match self {
            ResultKind::Translation => "translated_full.md",
            ResultKind::Summary => "summary_tinghua.md",
            ResultKind::Improvement => "improvements.md",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResultKind::Translation => "translation",
            ResultKind::Summary => "summary",
            ResultKind::Improvement => "improvement",
        }
    }
}

impl FromStr for ResultKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "translation" => Ok(ResultKind::Translation),
            "summary" => Ok(ResultKind::Summary),
            "improvement" => Ok(ResultKind::Improvement),
            other => Err(Error::BadRequest(format!("Unsupported content kind: {}", other))),
        }
    }
}

/// Catalogue entry for an uploaded paper
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaperMeta {
    pub paper_id: String,
    pub title: String,
    pub source_filename: String,
    pub created_at: DateTime<Utc>,
    pub target_language: String,
    pub status: PaperStatus,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub domain_tags: Vec<String>,
    /// SHA-256 of the uploaded bytes
    #[serde(default)]
    pub content_hash: Option<String>,
}

impl PaperMeta {
    /// New entry in `processing` state; the title is the file stem
    pub fn new(
        paper_id: impl Into<String>,
        source_filename: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        let source_filename = source_filename.into();
        let title = std::path::Path::new(&source_filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("untitled")
            .to_string();
        let now = Utc::now();

        Self {
            paper_id: paper_id.into(),
            title,
            source_filename,
            created_at: now,
            target_language: target_language.into(),
            status: PaperStatus::Processing,
            year: Some(now.year()),
            authors: Vec::new(),
            domain_tags: Vec::new(),
            content_hash: None,
        }
    }
}
