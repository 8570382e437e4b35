use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};

use super::db::DbHandle;
#[cfg(test)]
use super::db::TaskDb;
use crate::board::models::{ColumnId, ColumnOrder, NewTask, TaskRecord};

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub db: DbHandle,
}

pub type SharedState = Arc<AppState>;

// ── Error handling ────────────────────────────────────────────────────

pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

fn internal(e: anyhow::Error) -> ApiError {
    ApiError::Internal(format!("{:#}", e))
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/tasks/{id}",
            get(get_task).put(replace_task).delete(delete_task),
        )
        .route(
            "/api/columns/order",
            get(get_column_order).put(put_column_order),
        )
        .route("/health", get(health_check))
}

// ── Validation ────────────────────────────────────────────────────────

fn validate_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::BadRequest("Task title is required".into()));
    }
    Ok(())
}

fn validate_column(column: i32) -> Result<(), ApiError> {
    if ColumnId::from_index(column).is_none() {
        return Err(ApiError::BadRequest(format!(
            "Invalid column index {} (expected 0-{})",
            column,
            ColumnId::ALL.len() - 1
        )));
    }
    Ok(())
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn list_tasks(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let tasks = state
        .db
        .call(|db| db.list_tasks())
        .await
        .map_err(internal)?;
    Ok(Json(tasks))
}

async fn get_task(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lookup = id.clone();
    let task = state
        .db
        .call(move |db| db.get_task(&lookup))
        .await
        .map_err(internal)?;
    match task {
        Some(task) => Ok(Json(task)),
        None => Err(ApiError::NotFound(format!("Task {} not found", id))),
    }
}

async fn create_task(
    State(state): State<SharedState>,
    Json(req): Json<NewTask>,
) -> Result<impl IntoResponse, ApiError> {
    validate_title(&req.title)?;
    validate_column(req.column)?;
    let task = state
        .db
        .call(move |db| db.create_task(&req))
        .await
        .map_err(internal)?;
    tracing::info!(id = %task.id, column = task.column, row = task.row, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

async fn replace_task(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(task): Json<TaskRecord>,
) -> Result<impl IntoResponse, ApiError> {
    if task.id != id {
        return Err(ApiError::BadRequest("Task ID mismatch".into()));
    }
    validate_title(&task.title)?;
    validate_column(task.column)?;
    let replaced = state
        .db
        .call(move |db| db.replace_task(&task))
        .await
        .map_err(internal)?;
    match replaced {
        true => Ok(StatusCode::NO_CONTENT),
        false => Err(ApiError::NotFound(format!("Task {} not found", id))),
    }
}

async fn delete_task(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let target = id.clone();
    let deleted = state
        .db
        .call(move |db| db.delete_task(&target))
        .await
        .map_err(internal)?;
    match deleted {
        true => {
            tracing::info!(id = %id, "task deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        false => Err(ApiError::NotFound(format!("Task {} not found", id))),
    }
}

async fn get_column_order(
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .db
        .call(|db| db.column_order())
        .await
        .map_err(internal)?;
    Ok(Json(ColumnOrder::from_columns(&order)))
}

async fn put_column_order(
    State(state): State<SharedState>,
    Json(req): Json<ColumnOrder>,
) -> Result<impl IntoResponse, ApiError> {
    let order = req.to_columns().map_err(ApiError::BadRequest)?;
    state
        .db
        .call(move |db| db.set_column_order(&order))
        .await
        .map_err(internal)?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Tests ─────────────────────────────────────────────────────────────
