//! Task progress endpoints

use axum::{
    extract::{Path, State},
    http::header,
    response::{
        sse::{Event, Sse},
        IntoResponse,
    },
    Json,
};
use futures_util::StreamExt;
use serde::Serialize;
use std::convert::Infallible;

use crate::error::{Error, Result};
use crate::processing::{RegistryStats, SubscriptionEvent};
use crate::server::state::AppState;
use crate::types::TaskSnapshot;

/// SSE event name for task snapshots
pub const PROGRESS_EVENT: &str = "progress";

/// Response for task list
#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskSnapshot>,
    pub stats: RegistryStats,
}

/// GET /api/tasks - List all tasks with counts per state
pub async fn list_tasks(State(state): State<AppState>) -> Json<TaskListResponse> {
    Json(TaskListResponse {
        tasks: state.registry().list(),
        stats: state.registry().stats(),
    })
}

/// GET /api/tasks/:task_id - Current task snapshot
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskSnapshot>> {
    state
        .registry()
        .get(&task_id)
        .map(Json)
        .ok_or(Error::TaskNotFound(task_id))
}

/// GET /api/tasks/:task_id/events - Live progress as server-sent events
///
/// Sends the current snapshot first, then every transition, with comment
/// frames while idle. The stream closes after the final snapshot.
pub async fn task_events(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse> {
    let subscription = state.registry().subscribe(&task_id)?;
    let keep_alive = state.config().pipeline.keep_alive();
    tracing::info!("Streaming events for task {}", subscription.task_id());

    let events = subscription.into_stream(keep_alive).map(to_sse_event);

    Ok((
        [(header::CACHE_CONTROL, "no-cache")],
        Sse::new(events),
    ))
}

fn to_sse_event(event: SubscriptionEvent) -> std::result::Result<Event, Infallible> {
    let frame = match event {
        SubscriptionEvent::Snapshot(snapshot) => match Event::default()
            .event(PROGRESS_EVENT)
            .json_data(&snapshot)
        {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("Failed to encode snapshot for task {}: {}", snapshot.task_id, e);
                Event::default().comment("encode-error")
            }
        },
        SubscriptionEvent::KeepAlive => Event::default().comment("keep-alive"),
    };
    Ok(frame)
}
