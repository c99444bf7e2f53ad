//! Health, system info and template endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use serde_json::json;

use crate::error::Result;
use crate::server::state::AppState;

/// GET /api/health - Liveness check
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /api/ready - Readiness check
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Model and pipeline description
#[derive(Debug, Serialize)]
pub struct SystemInfoResponse {
    pub app_name: String,
    pub model_provider: String,
    pub llm_model_name: String,
    pub embedding_model_name: String,
    pub pipeline_mode: String,
}

/// GET /api/system/info
pub async fn system_info(State(state): State<AppState>) -> Json<SystemInfoResponse> {
    let system = &state.config().system;
    Json(SystemInfoResponse {
        app_name: system.app_name.clone(),
        model_provider: system.model_provider.clone(),
        llm_model_name: system.llm_model_name.clone(),
        embedding_model_name: system.embedding_model_name.clone(),
        pipeline_mode: system.pipeline_mode.clone(),
    })
}

#[derive(Debug, Serialize)]
pub struct TemplateInfo {
    pub name: String,
}

/// GET /api/templates - Available summary templates
pub async fn list_templates(State(state): State<AppState>) -> Result<Json<Vec<TemplateInfo>>> {
    let templates = state
        .store()
        .list_templates()
        .await?
        .into_iter()
        .map(|name| TemplateInfo { name })
        .collect();
    Ok(Json(templates))
}

/// GET /api/info - API info endpoint
pub async fn info() -> Json<serde_json::Value> {
    Json(json!({
        "name": "scholar-agent",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Paper pipeline with live task progress",
        "endpoints": {
            "POST /api/upload": "Upload a PDF and start its pipeline",
            "GET /api/tasks": "List tasks and counts per state",
            "GET /api/tasks/:task_id": "Get a task snapshot",
            "GET /api/tasks/:task_id/events": "Stream task progress (SSE)",
            "GET /api/papers": "List papers",
            "GET /api/papers/:paper_id": "Get paper details",
            "GET /api/papers/:paper_id/content/:kind": "Read translation, summary or improvement",
            "GET /api/papers/:paper_id/pdf": "Download the uploaded PDF",
            "GET /api/templates": "List summary templates",
            "GET /api/system/info": "Model and pipeline info"
        }
    }))
}
