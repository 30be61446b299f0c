use crate::auth::{AuthState, encode_jwt};
use crate::store::StoreError;
use crate::user::UserStore;
use crate::web::error::{ApiError, JsonBody};
use axum::{Json, Router, extract::State};
use axum_extra::extract::WithRejection;
use std::sync::Arc;

/// JSON request payload for API login
#[derive(serde::Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// JSON response for successful API login
#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct LoginResponse {
    pub session: String,
}

/// Creates a JSON API router for authentication endpoints.
pub fn create_api_router(state: Arc<AuthState>) -> Router<()> {
    Router::new()
        .route("/login", axum::routing::post(json_login_handler))
        .with_state(state)
}

/// Exchanges credentials for a session token.
#[tracing::instrument(skip(state, payload))]
pub async fn json_login_handler(
    State(state): State<Arc<AuthState>>,
    WithRejection(Json(payload), _): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let store = UserStore::open(&state.db).await?;
    let user = match store
        .get_user_by_creds(&payload.username, &payload.password)
        .await
    {
        Ok(user) => user,
        Err(StoreError::NotFound(_)) => return Err(ApiError::InvalidCredentials),
        Err(err) => return Err(err.into()),
    };

    let session = encode_jwt(user.id, &state.jwt_secret)?;
    tracing::info!("User {} logged in", user.id);
    Ok(Json(LoginResponse { session }))
}
