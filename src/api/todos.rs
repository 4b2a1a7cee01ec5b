//! Todo endpoints. Every operation is scoped to the authenticated user;
//! one user can never see or touch another user's items.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{CreateTodoRequest, Todo, TodoListResponse, TodoResponse};
use crate::AppState;

use super::auth::CurrentUser;
use super::error::{ApiError, ApiJson, ValidationErrorBuilder};
use super::validation::validate_task;

/// Validate a CreateTodoRequest
fn validate_create_request(req: &CreateTodoRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_task(req.task.as_deref().unwrap_or_default()) {
        errors.add("task", e);
    }

    errors.finish()
}

/// List the authenticated user's todos, oldest first
pub async fn list_todos(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<TodoListResponse>, ApiError> {
    let todos =
        sqlx::query_as::<_, Todo>("SELECT * FROM todos WHERE user_id = ? ORDER BY created_at ASC")
            .bind(&current.user_id)
            .fetch_all(&state.db)
            .await?;

    let tasks: Vec<TodoResponse> = todos.into_iter().map(TodoResponse::from).collect();
    Ok(Json(TodoListResponse { tasks }))
}

/// Create a todo for the authenticated user
pub async fn create_todo(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(req): ApiJson<CreateTodoRequest>,
) -> Result<Json<TodoResponse>, ApiError> {
    validate_create_request(&req)?;

    let task = req.task.as_deref().unwrap_or_default().trim();
    let completed = req.completed.unwrap_or(false) as i32;

    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query("INSERT INTO todos (id, task, completed, user_id, created_at) VALUES (?, ?, ?, ?, ?)")
        .bind(&id)
        .bind(task)
        .bind(completed)
        .bind(&current.user_id)
        .bind(&now)
        .execute(&state.db)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create todo: {}", e);
            ApiError::database("Failed to create todo")
        })?;

    let todo = sqlx::query_as::<_, Todo>("SELECT * FROM todos WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(TodoResponse::from(todo)))
}

/// Delete a todo.
///
/// The delete is scoped to the owner, and removing an id that is already
/// gone (or belongs to someone else) still answers 204, so repeated
/// deletes are safe.
pub async fn delete_todo(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let result = sqlx::query("DELETE FROM todos WHERE id = ? AND user_id = ?")
        .bind(&id)
        .bind(&current.user_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        tracing::debug!("Delete matched no todo (id {})", id);
    }

    Ok(StatusCode::NO_CONTENT)
}
