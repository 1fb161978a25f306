use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use taskdeck_core::model::{validate_task_input, TaskDetail, TaskInput};

use crate::error::ApiError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
}

async fn list_tasks(State(state): State<Arc<AppState>>) -> Result<Json<Vec<TaskDetail>>, ApiError> {
    let tasks = state.storage.list_tasks().await?;
    Ok(Json(tasks))
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<TaskDetail>, ApiError> {
    let task = state.storage.get_task(id).await?;
    Ok(Json(task))
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(input): Json<TaskInput>,
) -> Result<(StatusCode, Json<TaskDetail>), ApiError> {
    validate_task_input(&input)?;
    let task = state.storage.create_task(&input).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// Full replace; same validation as create.
async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(input): Json<TaskInput>,
) -> Result<Json<TaskDetail>, ApiError> {
    validate_task_input(&input)?;
    let task = state.storage.update_task(id, &input).await?;
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.storage.delete_task(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
