use std::sync::Arc;

use crate::{
    auth::{self, AuthState},
    task::TaskState,
    user::UserState,
};

use axum::{Router, middleware::from_fn_with_state};

use tower::ServiceBuilder;

/// Creates the API routes for JSON API endpoints.
///
/// Every route sees the CurrentUser extension when a valid session is
/// presented; handlers that need one reject anonymous callers themselves.
pub fn create_api_router(
    auth_state: Arc<AuthState>,
    user_state: Arc<UserState>,
    task_state: Arc<TaskState>,
) -> Router {
    let login_router = auth::api::v1::create_api_router(auth_state.clone());
    let users_router = crate::user::api::v1::create_api_router(user_state);
    let tasks_router = crate::task::api::v1::create_api_router(task_state);
    let api_routes = Router::new()
        .route(
            "/service/ping",
            axum::routing::get(super::ping_handler),
        )
        .merge(login_router)
        .merge(users_router)
        .merge(tasks_router);
    Router::new()
        .nest("/api/v1", api_routes)
        .layer(ServiceBuilder::new().layer(from_fn_with_state(
            auth_state,
            auth::auth_user_middleware,
        )))
}
