//! API routes for the scholar server

pub mod papers;
pub mod system;
pub mod tasks;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Health and info
        .route("/health", get(system::health))
        .route("/ready", get(system::readiness))
        .route("/info", get(system::info))
        .route("/system/info", get(system::system_info))
        .route("/templates", get(system::list_templates))
        // Upload - with larger body limit for PDFs
        .route(
            "/upload",
            post(papers::upload_paper).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        // Task progress
        .route("/tasks", get(tasks::list_tasks))
        .route("/tasks/:task_id", get(tasks::get_task))
        .route("/tasks/:task_id/events", get(tasks::task_events))
        // Papers and results
        .route("/papers", get(papers::list_papers))
        .route("/papers/:paper_id", get(papers::get_paper))
        .route("/papers/:paper_id/content/:kind", get(papers::get_paper_content))
        .route("/papers/:paper_id/pdf", get(papers::get_paper_pdf))
}
