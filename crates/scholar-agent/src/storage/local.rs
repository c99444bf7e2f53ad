//! Filesystem-backed paper store
//!
//! Layout under the data directory:
//! - `raw/<paper_id>.pdf`: uploaded source
//! - `processed/<paper_id>/`: generated artifacts and `chunks.json`
//! - `papers.json`: the paper catalogue

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::ArtifactStore;
use crate::error::{Error, Result};
use crate::types::{PaperMeta, PaperStatus, ResultKind};

const CATALOGUE_FILE: &str = "papers.json";
const CHUNKS_FILE: &str = "chunks.json";

const DEFAULT_TEMPLATE: &str = "# Core Ideas (Tinghua)\n\n\
## 1. Problem Statement\n- What problem does this paper solve?\n\n\
## 2. Method\n- Main idea and technical route.\n\n\
## 3. Experiments\n- Dataset / metrics / key results.\n\n\
## 4. Strengths and Limits\n- Strong points and known limitations.\n\n\
## 5. Takeaways\n- Reusable insights and practical notes.\n";

/// Local filesystem paper store
pub struct LocalPaperStore {
    raw_dir: PathBuf,
    processed_dir: PathBuf,
    catalogue_path: PathBuf,
    templates_dir: PathBuf,
    default_template: String,
    /// Serializes read-modify-write cycles on the catalogue
    catalogue_lock: Mutex<()>,
}

impl LocalPaperStore {
    /// Create the store, creating directories, an empty catalogue and the
    /// default template when missing
    pub fn new(
        data_dir: impl Into<PathBuf>,
        templates_dir: impl Into<PathBuf>,
        default_template: impl Into<String>,
    ) -> Result<Self> {
        let data_dir = data_dir.into();
        let store = Self {
            raw_dir: data_dir.join("raw"),
            processed_dir: data_dir.join("processed"),
            catalogue_path: data_dir.join(CATALOGUE_FILE),
            templates_dir: templates_dir.into(),
            default_template: default_template.into(),
            catalogue_lock: Mutex::new(()),
        };

        std::fs::create_dir_all(&store.raw_dir)?;
        std::fs::create_dir_all(&store.processed_dir)?;
        std::fs::create_dir_all(&store.templates_dir)?;

        if !store.catalogue_path.exists() {
            std::fs::write(&store.catalogue_path, "[]")?;
        }

        let default_path = store.templates_dir.join(&store.default_template);
        if !default_path.exists() {
            std::fs::write(&default_path, DEFAULT_TEMPLATE)?;
            tracing::info!("Seeded default template at {}", default_path.display());
        }

        Ok(store)
    }

    /// Output directory for one paper's artifacts
    fn output_dir(&self, paper_id: &str) -> Result<PathBuf> {
        check_id(paper_id)?;
        Ok(self.processed_dir.join(paper_id))
    }

    /// Store the uploaded bytes and return their SHA-256
    pub async fn save_upload(&self, paper_id: &str, data: &[u8]) -> Result<String> {
        check_id(paper_id)?;
        tokio::fs::write(self.source_path(paper_id), data).await?;
        Ok(hex::encode(Sha256::digest(data)))
    }

    /// Whether the raw upload exists on disk
    pub async fn source_exists(&self, paper_id: &str) -> bool {
        if check_id(paper_id).is_err() {
            return false;
        }
        tokio::fs::try_exists(self.source_path(paper_id))
            .await
            .unwrap_or(false)
    }

    async fn load_catalogue(&self) -> Result<Vec<PaperMeta>> {
        let content = match tokio::fs::read_to_string(&self.catalogue_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the catalogue through a temp file so readers never see a torn file
    async fn save_catalogue(&self, papers: Vec<PaperMeta>) -> Result<()> {
        let path = self.catalogue_path.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let json = serde_json::to_string_pretty(&papers)?;
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
            tmp.write_all(json.as_bytes())?;
            tmp.persist(&path).map_err(|e| Error::Io(e.error))?;
            Ok(())
        })
        .await?
    }

    /// Insert or replace a catalogue entry
    pub async fn upsert_paper(&self, paper: &PaperMeta) -> Result<()> {
        let _guard = self.catalogue_lock.lock().await;
        let mut papers = self.load_catalogue().await?;
        match papers.iter_mut().find(|p| p.paper_id == paper.paper_id) {
            Some(existing) => *existing = paper.clone(),
            None => papers.push(paper.clone()),
        }
        self.save_catalogue(papers).await
    }

    /// Set a paper's status, recording domain tags when given
    pub async fn update_paper_status(
        &self,
        paper_id: &str,
        status: PaperStatus,
        domain_tags: Option<Vec<String>>,
    ) -> Result<()> {
        let _guard = self.catalogue_lock.lock().await;
        let mut papers = self.load_catalogue().await?;
        let Some(paper) = papers.iter_mut().find(|p| p.paper_id == paper_id) else {
            tracing::warn!("Status update for unknown paper {}", paper_id);
            return Ok(());
        };
        paper.status = status;
        if let Some(tags) = domain_tags {
            paper.domain_tags = tags;
        }
        self.save_catalogue(papers).await
    }

    /// All papers, newest first
    pub async fn list_papers(&self) -> Result<Vec<PaperMeta>> {
        let mut papers = self.load_catalogue().await?;
        papers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(papers)
    }

    /// Get a paper by ID
    pub async fn get_paper(&self, paper_id: &str) -> Result<Option<PaperMeta>> {
        Ok(self
            .load_catalogue()
            .await?
            .into_iter()
            .find(|p| p.paper_id == paper_id))
    }

    /// Read an artifact; empty when it has not been written
    pub async fn read_artifact(&self, paper_id: &str, kind: ResultKind) -> Result<String> {
        let path = self.output_dir(paper_id)?.join(kind.file_name());
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Load persisted chunks; empty when none were written
    pub async fn load_chunks(&self, paper_id: &str) -> Result<Vec<String>> {
        let path = self.output_dir(paper_id)?.join(CHUNKS_FILE);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Template file names (`*.md`), sorted
    pub async fn list_templates(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.templates_dir).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("md") {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl ArtifactStore for LocalPaperStore {
    fn source_path(&self, paper_id: &str) -> PathBuf {
        self.raw_dir.join(format!("{}.pdf", paper_id))
    }

    async fn paper_exists(&self, paper_id: &str) -> Result<bool> {
        Ok(self.get_paper(paper_id).await?.is_some())
    }

    async fn persist_chunks(&self, paper_id: &str, chunks: &[String]) -> Result<()> {
        let dir = self.output_dir(paper_id)?;
        tokio::fs::create_dir_all(&dir).await?;
        let json = serde_json::to_string_pretty(chunks)?;
        tokio::fs::write(dir.join(CHUNKS_FILE), json).await?;
        Ok(())
    }

    async fn persist_artifact(&self, paper_id: &str, kind: ResultKind, content: &str) -> Result<()> {
        let dir = self.output_dir(paper_id)?;
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(kind.file_name()), content).await?;
        Ok(())
    }

    async fn read_template(&self, name: &str) -> Result<String> {
        let requested = Path::new(name);
        let is_plain_name = requested.components().count() == 1
            && requested.file_name().is_some_and(|n| n == requested.as_os_str());

        let path = if is_plain_name && self.templates_dir.join(name).is_file() {
            self.templates_dir.join(name)
        } else {
            tracing::debug!("Template '{}' not found, using {}", name, self.default_template);
            self.templates_dir.join(&self.default_template)
        };

        Ok(tokio::fs::read_to_string(path).await?)
    }

    async fn mark_failed(&self, paper_id: &str) -> Result<()> {
        self.update_paper_status(paper_id, PaperStatus::Failed, None)
            .await
    }

    fn name(&self) -> &str {
        "local"
    }
}

/// Ids become path segments; only allow ASCII alphanumerics, '-' and '_'
fn check_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::BadRequest(format!("Invalid id: {:?}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn store() -> (tempfile::TempDir, LocalPaperStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalPaperStore::new(
            dir.path().join("data"),
            dir.path().join("templates"),
            "tinghua.md",
        )
        .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_seeds_default_template() {
        let (_dir, store) = store();
        assert_eq!(store.list_templates().await.unwrap(), vec!["tinghua.md"]);
        let template = store.read_template("tinghua.md").await.unwrap();
        assert!(template.starts_with("# Core Ideas"));
    }

    #[tokio::test]
    async fn test_missing_or_unsafe_template_falls_back() {
        let (_dir, store) = store();
        let fallback = store.read_template("missing.md").await.unwrap();
        let traversal = store.read_template("../data/papers.json").await.unwrap();
        assert!(fallback.starts_with("# Core Ideas"));
        assert_eq!(fallback, traversal);
    }

    #[tokio::test]
    async fn test_catalogue_upsert_and_status() {
        let (_dir, store) = store();
        let mut older = PaperMeta::new("p1", "one.pdf", "Chinese");
        older.created_at = older.created_at - Duration::hours(1);
        let newer = PaperMeta::new("p2", "two.pdf", "English");

        store.upsert_paper(&older).await.unwrap();
        store.upsert_paper(&newer).await.unwrap();
        store.upsert_paper(&newer).await.unwrap();

        let papers = store.list_papers().await.unwrap();
        let ids: Vec<_> = papers.iter().map(|p| p.paper_id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p1"]);

        store
            .update_paper_status("p1", PaperStatus::Completed, Some(vec!["NLP".to_string()]))
            .await
            .unwrap();
        let p1 = store.get_paper("p1").await.unwrap().unwrap();
        assert_eq!(p1.status, PaperStatus::Completed);
        assert_eq!(p1.domain_tags, vec!["NLP"]);

        // Unknown papers are ignored
        store
            .update_paper_status("nope", PaperStatus::Failed, None)
            .await
            .unwrap();
        assert!(store.paper_exists("p2").await.unwrap());
        assert!(!store.paper_exists("nope").await.unwrap());

        store.mark_failed("p2").await.unwrap();
        let p2 = store.get_paper("p2").await.unwrap().unwrap();
        assert_eq!(p2.status, PaperStatus::Failed);
    }

    #[tokio::test]
    async fn test_artifacts_and_chunks() {
        let (_dir, store) = store();
        assert_eq!(store.read_artifact("p1", ResultKind::Summary).await.unwrap(), "");
        assert!(store.load_chunks("p1").await.unwrap().is_empty());

        store
            .persist_artifact("p1", ResultKind::Summary, "# Summary")
            .await
            .unwrap();
        store
            .persist_chunks("p1", &["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        assert_eq!(
            store.read_artifact("p1", ResultKind::Summary).await.unwrap(),
            "# Summary"
        );
        assert_eq!(store.load_chunks("p1").await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_upload_hash_and_invalid_ids() {
        let (_dir, store) = store();
        let hash = store.save_upload("p1", b"%PDF-1.4").await.unwrap();
        assert_eq!(hash.len(), 64);
        assert!(store.source_exists("p1").await);
        assert!(!store.source_exists("../p1").await);

        let result = store.read_artifact("../escape", ResultKind::Summary).await;
        assert!(matches!(result, Err(Error::BadRequest(_))));
    }
}
