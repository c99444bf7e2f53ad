//! Paper upload and result endpoints

use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::storage::ArtifactStore;
use crate::server::state::AppState;
use crate::types::{PaperMeta, PaperStatus, ResultKind};

/// Response from upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub task_id: String,
    pub paper_id: String,
}

/// Generated content of one paper
#[derive(Debug, Serialize)]
pub struct ContentResponse {
    pub paper_id: String,
    pub kind: ResultKind,
    pub content: String,
}

/// POST /api/upload - Store a PDF and start its pipeline
///
/// Multipart fields: `file` (required, `.pdf`), `target_language`,
/// `summary_template`.
pub async fn upload_paper(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut target_language = state.config().pipeline.default_target_language.clone();
    let mut template_name = state.config().storage.default_template.clone();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::BadRequest(format!("Failed to read multipart field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| Error::BadRequest(format!("Failed to read file: {}", e)))?;
                upload = Some((filename, data.to_vec()));
            }
            "target_language" | "summary_template" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| Error::BadRequest(format!("Failed to read {}: {}", name, e)))?;
                let value = value.trim();
                if !value.is_empty() {
                    if name == "target_language" {
                        target_language = value.to_string();
                    } else {
                        template_name = value.to_string();
                    }
                }
            }
            other => tracing::debug!("Ignoring multipart field '{}'", other),
        }
    }

    let (filename, data) = upload.ok_or_else(|| Error::BadRequest("No file provided".to_string()))?;
    if !filename.to_lowercase().ends_with(".pdf") {
        return Err(Error::BadRequest("Only PDF uploads are supported".to_string()));
    }

    let paper_id = Uuid::new_v4().simple().to_string()[..12].to_string();
    let content_hash = state.store().save_upload(&paper_id, &data).await?;

    let mut paper = PaperMeta::new(&paper_id, &filename, target_language);
    paper.content_hash = Some(content_hash);
    state.store().upsert_paper(&paper).await?;

    let task_id = state.start_pipeline(&paper, &template_name)?;
    tracing::info!(
        "Accepted upload {} ({} bytes) as paper {}, task {}",
        filename,
        data.len(),
        paper_id,
        task_id
    );

    Ok(Json(UploadResponse { task_id, paper_id }))
}

/// GET /api/papers - List papers, newest first
pub async fn list_papers(State(state): State<AppState>) -> Result<Json<Vec<PaperMeta>>> {
    Ok(Json(state.store().list_papers().await?))
}

/// GET /api/papers/:paper_id - Get paper details
pub async fn get_paper(
    State(state): State<AppState>,
    Path(paper_id): Path<String>,
) -> Result<Json<PaperMeta>> {
    state
        .store()
        .get_paper(&paper_id)
        .await?
        .map(Json)
        .ok_or(Error::PaperNotFound(paper_id))
}

/// GET /api/papers/:paper_id/content/:kind - Read a generated artifact
///
/// Failed papers report empty content rather than a partial result. The
/// pipeline marks the paper failed before it publishes the failed snapshot.
pub async fn get_paper_content(
    State(state): State<AppState>,
    Path((paper_id, kind)): Path<(String, String)>,
) -> Result<Json<ContentResponse>> {
    let kind: ResultKind = kind.parse()?;
    let paper = state
        .store()
        .get_paper(&paper_id)
        .await?
        .ok_or_else(|| Error::PaperNotFound(paper_id.clone()))?;

    let content = if paper.status == PaperStatus::Failed {
        String::new()
    } else {
        state.store().read_artifact(&paper_id, kind).await?
    };

    Ok(Json(ContentResponse {
        paper_id,
        kind,
        content,
    }))
}

/// GET /api/papers/:paper_id/pdf - Download the uploaded PDF
pub async fn get_paper_pdf(
    State(state): State<AppState>,
    Path(paper_id): Path<String>,
) -> Result<impl IntoResponse> {
    let store = state.store();
    if !store.paper_exists(&paper_id).await? || !store.source_exists(&paper_id).await {
        return Err(Error::PaperNotFound(paper_id));
    }

    let data = tokio::fs::read(store.source_path(&paper_id)).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}.pdf\"", paper_id),
            ),
        ],
        data,
    ))
}
