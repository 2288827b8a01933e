use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::envelope::{ApiError, Success};
use super::state::AppState;
use super::validation::{self, ListTodosQuery};
use crate::error::AppError;
use crate::export::{generate_csv, upload_and_sign};
use crate::flags::{self, EXPORT_QUEUE_FLAG};
use crate::models::*;
use crate::system::collect_system_info;

type ApiResult<T> = Result<Success<T>, ApiError>;

const QUEUED_MESSAGE: &str =
    "Export request has been queued for processing. The file will be available shortly.";

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Todos
// ============================================================

pub async fn list_todos(
    State(state): State<AppState>,
    Query(query): Query<ListTodosQuery>,
) -> ApiResult<Vec<TodoItem>> {
    let order = validation::sort_order(&query).map_err(|e| state.reject(e))?;
    let mut todos = state.store.list_all().await.map_err(|e| state.reject(e))?;

    if let Some((field, direction)) = order {
        sort_todos(&mut todos, field, direction);
    }

    Ok(Success::ok(todos))
}

pub async fn get_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<TodoItem> {
    state
        .store
        .get_by_id(&id)
        .await
        .map_err(|e| state.reject(e))?
        .map(Success::ok)
        .ok_or_else(|| state.reject(AppError::not_found(id)))
}

pub async fn create_todo(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<TodoItem> {
    let body = validation::body_object(body).map_err(|e| state.reject(e))?;
    let input = validation::create_input(&body).map_err(|e| state.reject(e))?;

    state
        .store
        .create(input)
        .await
        .map(Success::created)
        .map_err(|e| state.reject(e))
}

pub async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<TodoItem> {
    let body = validation::body_object(body).map_err(|e| state.reject(e))?;
    let input = validation::update_input(&body).map_err(|e| state.reject(e))?;

    state
        .store
        .update(&id, input)
        .await
        .map_err(|e| state.reject(e))?
        .map(Success::ok)
        .ok_or_else(|| state.reject(AppError::not_found(id)))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: &'static str,
    pub id: String,
}

pub async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DeleteResponse> {
    if state.store.delete(&id).await.map_err(|e| state.reject(e))? {
        Ok(Success::ok(DeleteResponse {
            message: "Todo deleted successfully",
            id,
        }))
    } else {
        Err(state.reject(AppError::not_found(id)))
    }
}

// ============================================================
// Export
// ============================================================

pub async fn export_todos(State(state): State<AppState>) -> ApiResult<ExportOutcome> {
    run_export(&state)
        .await
        .map(Success::ok)
        .map_err(|e| state.reject(e))
}

/// Queue or generate an export, depending on the export-queue flag.
///
/// An empty table fails with `NoData` before anything is queued or uploaded.
async fn run_export(state: &AppState) -> Result<ExportOutcome, AppError> {
    let flags = state.flags.fetch_all().await;
    let use_queue = flags::is_enabled(&flags, EXPORT_QUEUE_FLAG);

    let todos = state.store.list_all().await?;
    if todos.is_empty() {
        return Err(AppError::NoData);
    }

    if use_queue {
        let message = ExportQueueMessage {
            export_id: Uuid::new_v4().to_string(),
            requested_at: now_canonical(),
            export_type: ExportType::Csv,
            filters: None,
        };
        state.queue.send(&message).await?;

        return Ok(ExportOutcome::Queued(QueuedExport {
            export_id: message.export_id,
            queued_at: message.requested_at,
            message: QUEUED_MESSAGE.to_string(),
        }));
    }

    if let Some(delay) = state.export_delay {
        tracing::info!(delay_ms = delay.as_millis() as u64, "Delaying export");
        tokio::time::sleep(delay).await;
    }

    let csv = generate_csv(&todos);
    let export = upload_and_sign(state.storage.as_ref(), csv).await?;
    tracing::info!(file_name = %export.file_name, rows = todos.len(), "Export ready");

    Ok(ExportOutcome::Ready(export))
}

// ============================================================
// Feature flags
// ============================================================

pub async fn feature_flags(State(state): State<AppState>) -> ApiResult<FeatureFlags> {
    Ok(Success::ok(state.flags.fetch_all().await))
}

// ============================================================
// System
// ============================================================

pub async fn system_info(State(state): State<AppState>) -> ApiResult<SystemInfo> {
    Ok(Success::ok(collect_system_info(state.environment)))
}
