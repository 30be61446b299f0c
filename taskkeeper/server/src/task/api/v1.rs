use crate::auth::CurrentUser;
use crate::task::{TaskState, TaskStore};
use crate::user::UserStore;
use crate::web::error::{ApiError, JsonBody, parse_id};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use std::sync::Arc;
use taskkeeper_core::{Actor, NewTask, Task, TaskPatch, build_task_query};
use uuid::Uuid;

/// Query parameters for listing tasks. Empty values mean "absent".
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TasksQuery {
    #[serde(rename = "userID")]
    user_id: String,
    from: String,
    to: String,
}

async fn list_tasks(
    state: &TaskState,
    actor: Actor,
    user_id: Option<Uuid>,
    params: &TasksQuery,
) -> Result<Vec<Task>, ApiError> {
    let mut query = build_task_query(user_id, None, &params.from, &params.to)?;
    query.user_id = actor.task_view_scope(query.user_id)?;

    let store = TaskStore::open(&state.db).await?;
    Ok(store.get_all_tasks(&query).await?)
}

async fn create_task(
    state: &TaskState,
    actor: Actor,
    new_task: NewTask,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    new_task.validate()?;
    let owner = new_task.user_id.unwrap_or_default();
    actor.authorize_task_owner(owner)?;

    if owner != actor.id() {
        UserStore::open(&state.db)
            .await?
            .get_user_by_id(owner)
            .await?;
    }
    let store = TaskStore::open(&state.db).await?;
    let task = store.create_task(new_task).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// Handler for GET /api/v1/tasks?userID&from&to.
///
/// Without ViewAllTasks the listing is narrowed to the caller's own tasks,
/// and naming another user is forbidden.
#[tracing::instrument(skip(state))]
pub async fn get_tasks_handler(
    State(state): State<Arc<TaskState>>,
    current_user: CurrentUser,
    Query(params): Query<TasksQuery>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let user_id = match params.user_id.as_str() {
        "" => None,
        raw => Some(parse_id("userID", raw)?),
    };
    let tasks = list_tasks(&state, current_user.actor(), user_id, &params).await?;
    Ok(Json(tasks))
}

/// Handler for POST /api/v1/tasks.
#[tracing::instrument(skip(state))]
pub async fn create_task_handler(
    State(state): State<Arc<TaskState>>,
    current_user: CurrentUser,
    WithRejection(Json(new_task), _): JsonBody<NewTask>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    create_task(&state, current_user.actor(), new_task).await
}

/// Handler for GET /api/v1/tasks/{taskID}.
#[tracing::instrument(skip(state))]
pub async fn get_task_handler(
    State(state): State<Arc<TaskState>>,
    current_user: CurrentUser,
    Path(task_id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let task_id = parse_id("taskID", &task_id)?;
    let scope = current_user.actor().task_view_scope(None)?;
    let query = build_task_query(scope, Some(task_id), "", "")?;

    let store = TaskStore::open(&state.db).await?;
    Ok(Json(store.get_task(&query).await?))
}

/// Handler for PATCH /api/v1/tasks/{taskID}.
///
/// A task outside the caller's write scope is reported as not found.
#[tracing::instrument(skip(state))]
pub async fn patch_task_handler(
    State(state): State<Arc<TaskState>>,
    current_user: CurrentUser,
    Path(task_id): Path<String>,
    WithRejection(Json(patch), _): JsonBody<TaskPatch>,
) -> Result<Json<Task>, ApiError> {
    let task_id = parse_id("taskID", &task_id)?;
    if patch.no_change() {
        return Err(ApiError::BadRequest("body is empty"));
    }
    let scope = current_user.actor().task_write_scope()?;
    let query = build_task_query(scope, Some(task_id), "", "")?;

    let store = TaskStore::open(&state.db).await?;
    let task = store.get_task(&query).await?;
    Ok(Json(store.update_task(task.id, &patch).await?))
}

/// Handler for DELETE /api/v1/tasks/{taskID}. Returns the deleted task.
#[tracing::instrument(skip(state))]
pub async fn delete_task_handler(
    State(state): State<Arc<TaskState>>,
    current_user: CurrentUser,
    Path(task_id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let task_id = parse_id("taskID", &task_id)?;
    let scope = current_user.actor().task_write_scope()?;
    let query = build_task_query(scope, Some(task_id), "", "")?;

    let store = TaskStore::open(&state.db).await?;
    let task = store.get_task(&query).await?;
    Ok(Json(store.delete_task(task.id).await?))
}

/// Handler for GET /api/v1/users/{userID}/tasks?from&to.
#[tracing::instrument(skip(state))]
pub async fn get_user_tasks_handler(
    State(state): State<Arc<TaskState>>,
    current_user: CurrentUser,
    Path(user_id): Path<String>,
    Query(params): Query<TasksQuery>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let user_id = parse_id("userID", &user_id)?;
    let tasks = list_tasks(&state, current_user.actor(), Some(user_id), &params).await?;
    Ok(Json(tasks))
}

/// Handler for POST /api/v1/users/{userID}/tasks. The path names the owner.
#[tracing::instrument(skip(state))]
pub async fn create_user_task_handler(
    State(state): State<Arc<TaskState>>,
    current_user: CurrentUser,
    Path(user_id): Path<String>,
    WithRejection(Json(mut new_task), _): JsonBody<NewTask>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    new_task.user_id = Some(parse_id("userID", &user_id)?);
    create_task(&state, current_user.actor(), new_task).await
}

/// Creates and returns the tasks API router.
pub fn create_api_router(state: Arc<TaskState>) -> Router {
    Router::new()
        .route("/tasks", get(get_tasks_handler).post(create_task_handler))
        .route(
            "/tasks/{taskID}",
            get(get_task_handler)
                .patch(patch_task_handler)
                .delete(delete_task_handler),
        )
        .route(
            "/users/{userID}/tasks",
            get(get_user_tasks_handler).post(create_user_task_handler),
        )
        .with_state(state)
}
