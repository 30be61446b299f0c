use crate::auth::CurrentUser;
use crate::store::StoreError;
use crate::task::TaskStore;
use crate::user::{UserState, UserStore};
use crate::web::error::{ApiError, JsonBody, parse_id};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use axum_extra::extract::WithRejection;
use std::sync::Arc;
use taskkeeper_core::{
    NewUser, Permission, Role, User, UserPatch, ValidationError, authorize_user_creation,
};

/// Handler for POST /api/v1/users.
///
/// Anonymous callers register themselves as plain users. Creating any other
/// role needs ModifyAllUsers.
#[tracing::instrument(skip(state))]
pub async fn create_user_handler(
    State(state): State<Arc<UserState>>,
    current_user: Option<CurrentUser>,
    WithRejection(Json(mut new_user), _): JsonBody<NewUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    new_user.validate()?;
    let actor_role = current_user.as_ref().map_or(Role::Anon, |user| user.0.role);
    new_user.role = Some(authorize_user_creation(actor_role, new_user.role)?);

    let store = UserStore::open(&state.db).await?;
    let user = store.create_user(new_user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Handler for GET /api/v1/users.
#[tracing::instrument(skip(state))]
pub async fn get_users_handler(
    State(state): State<Arc<UserState>>,
    current_user: CurrentUser,
) -> Result<Json<Vec<User>>, ApiError> {
    current_user
        .actor()
        .authorize(Permission::ModifyAllUsersRestricted)?;
    let store = UserStore::open(&state.db).await?;
    Ok(Json(store.get_all_users().await?))
}

/// Handler for GET /api/v1/users/{userID}. Accepts an id or a username.
#[tracing::instrument(skip(state))]
pub async fn get_user_handler(
    State(state): State<Arc<UserState>>,
    current_user: CurrentUser,
    Path(key): Path<String>,
) -> Result<Json<User>, ApiError> {
    let id = uuid::Uuid::parse_str(&key).ok();
    let is_self = match id {
        Some(id) => id == current_user.0.id,
        None => key == current_user.0.username,
    };
    current_user.actor().authorize_user_view(is_self)?;

    let store = UserStore::open(&state.db).await?;
    let user = match id {
        Some(id) => store.get_user_by_id(id).await?,
        None => store.get_user_by_username(&key).await?,
    };
    Ok(Json(user))
}

/// Handler for PATCH /api/v1/users/{userID}.
#[tracing::instrument(skip(state))]
pub async fn patch_user_handler(
    State(state): State<Arc<UserState>>,
    current_user: CurrentUser,
    Path(user_id): Path<String>,
    WithRejection(Json(patch), _): JsonBody<UserPatch>,
) -> Result<Json<User>, ApiError> {
    let id = parse_id("userID", &user_id)?;
    if patch.no_change() {
        return Err(ApiError::BadRequest("body is empty"));
    }
    patch.validate()?;
    let actor = current_user.actor();
    actor.authorize_user_target(id)?;

    let store = UserStore::open(&state.db).await?;
    let target = store.get_user_by_id(id).await?;
    actor.authorize_user_write(&target, patch.role)?;

    if patch.password.is_some() && target.id == actor.id() {
        let old_password = patch
            .old_password
            .as_deref()
            .filter(|password| !password.is_empty())
            .ok_or(ValidationError::new("oldPassword", "non-empty string"))?;
        match store.get_user_by_creds(&target.username, old_password).await {
            Ok(_) => {}
            Err(StoreError::NotFound(_)) => return Err(ApiError::InvalidCredentials),
            Err(err) => return Err(err.into()),
        }
    }

    Ok(Json(store.update_user(id, patch).await?))
}

/// Handler for DELETE /api/v1/users/{userID}.
///
/// Removes the user's tasks first, then the user. A failure in between
/// leaves a user without tasks rather than tasks without an owner.
#[tracing::instrument(skip(state))]
pub async fn delete_user_handler(
    State(state): State<Arc<UserState>>,
    current_user: CurrentUser,
    Path(user_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let id = parse_id("userID", &user_id)?;
    let actor = current_user.actor();
    actor.authorize_user_target(id)?;

    let users = UserStore::open(&state.db).await?;
    let target = users.get_user_by_id(id).await?;
    actor.authorize_user_write(&target, None)?;

    let tasks = TaskStore::open(&state.db).await?;
    let removed = tasks.delete_tasks_for_user(id).await?;
    let deleted = users.delete_user(id).await?;
    tracing::info!("User {} deleted along with {} tasks", id, removed);
    Ok(Json(deleted))
}

/// Creates and returns the users API router.
pub fn create_api_router(state: Arc<UserState>) -> Router {
    Router::new()
        .route("/users", get(get_users_handler).post(create_user_handler))
        .route(
            "/users/{userID}",
            get(get_user_handler)
                .patch(patch_user_handler)
                .delete(delete_user_handler),
        )
        .with_state(state)
}
