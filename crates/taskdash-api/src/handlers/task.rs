use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use taskdash_core::{NewTask, Task, TaskPatch};

use super::{internal_error, not_found, ErrorResponse};
use crate::state::ApiState;

/// List all tasks
pub async fn list_tasks(
    State(state): State<ApiState>,
) -> Result<Json<Vec<Task>>, (StatusCode, Json<ErrorResponse>)> {
    state
        .db
        .list_tasks()
        .await
        .map(Json)
        .map_err(internal_error)
}

/// Get a single task
pub async fn get_task(
    State(state): State<ApiState>,
    Path(task_id): Path<i64>,
) -> Result<Json<Task>, (StatusCode, Json<ErrorResponse>)> {
    match state.db.get_task(task_id).await {
        Ok(Some(task)) => Ok(Json(task)),
        Ok(None) => Err(not_found("Task not found")),
        Err(e) => Err(internal_error(e)),
    }
}

/// Create a task
pub async fn create_task(
    State(state): State<ApiState>,
    Json(payload): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>), (StatusCode, Json<ErrorResponse>)> {
    match state.db.create_task(&payload).await {
        Ok(task) => Ok((StatusCode::CREATED, Json(task))),
        Err(e) => Err(internal_error(e)),
    }
}

/// Update a task with a partial payload
pub async fn update_task(
    State(state): State<ApiState>,
    Path(task_id): Path<i64>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Task>, (StatusCode, Json<ErrorResponse>)> {
    match state.db.update_task(task_id, &patch).await {
        Ok(Some(task)) => Ok(Json(task)),
        Ok(None) => Err(not_found("Task not found")),
        Err(e) => Err(internal_error(e)),
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
}

/// Delete a task
pub async fn delete_task(
    State(state): State<ApiState>,
    Path(task_id): Path<i64>,
) -> Result<Json<DeleteResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.db.delete_task(task_id).await {
        Ok(true) => Ok(Json(DeleteResponse {
            message: "Task deleted".to_string(),
        })),
        Ok(false) => Err(not_found("Task not found")),
        Err(e) => Err(internal_error(e)),
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkCreateRequest {
    #[serde(default)]
    pub tasks: Vec<NewTask>,
}

/// Create several tasks at once
pub async fn bulk_create_tasks(
    State(state): State<ApiState>,
    Json(payload): Json<BulkCreateRequest>,
) -> Result<(StatusCode, Json<Vec<Task>>), (StatusCode, Json<ErrorResponse>)> {
    match state.db.create_tasks_bulk(&payload.tasks).await {
        Ok(tasks) => Ok((StatusCode::CREATED, Json(tasks))),
        Err(e) => Err(internal_error(e)),
    }
}
