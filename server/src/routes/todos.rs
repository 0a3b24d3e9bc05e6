//! Per-user todo collection routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tasklist_engine::{FieldUpdate, TaskDocument};

use crate::auth::AuthUser;
use crate::error::Result;
use crate::handlers::{handle_delete, handle_list, handle_patch, handle_put, ListResponse};
use crate::AppState;

/// Create collection routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/{user_id}/todos", get(list_handler))
        .route(
            "/users/{user_id}/todos/{task_id}",
            axum::routing::put(put_handler)
                .patch(patch_handler)
                .delete(delete_handler),
        )
}

/// GET /users/{user_id}/todos - Every document in the collection.
async fn list_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<ListResponse>> {
    auth.authorize(&user_id)?;
    Ok(Json(handle_list(&state.pool, &user_id).await?))
}

/// PUT /users/{user_id}/todos/{task_id} - Write a whole document.
async fn put_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((user_id, task_id)): Path<(String, String)>,
    Json(document): Json<TaskDocument>,
) -> Result<StatusCode> {
    auth.authorize(&user_id)?;
    handle_put(&state.pool, &user_id, &task_id, document).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /users/{user_id}/todos/{task_id} - Update one field.
async fn patch_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((user_id, task_id)): Path<(String, String)>,
    Json(update): Json<FieldUpdate>,
) -> Result<StatusCode> {
    auth.authorize(&user_id)?;
    handle_patch(&state.pool, &user_id, &task_id, update).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /users/{user_id}/todos/{task_id} - Remove a document.
async fn delete_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((user_id, task_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    auth.authorize(&user_id)?;
    handle_delete(&state.pool, &user_id, &task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
