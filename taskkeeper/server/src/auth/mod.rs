use axum::extract::{FromRequestParts, OptionalFromRequestParts, Request, State};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sea_orm::DatabaseConnection;
use std::convert::Infallible;
use std::sync::Arc;
use taskkeeper_core::{Actor, User};
use uuid::Uuid;

use crate::store::StoreError;
use crate::user::UserStore;
use crate::web::error::ApiError;

pub mod api;

/// Represents the currently authenticated user, as stored right now.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    /// The identity and role that authorization decisions are made for.
    pub fn actor(&self) -> Actor {
        Actor::new(self.0.id, self.0.role)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(ApiError::Unauthenticated)
    }
}

impl<S: Send + Sync> OptionalFromRequestParts<S> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<CurrentUser>().cloned())
    }
}

/// Authentication state: the signing secret and the store sessions are
/// verified against.
#[derive(Clone)]
pub struct AuthState {
    pub jwt_secret: String,
    pub db: Arc<DatabaseConnection>,
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct Claims {
    pub exp: usize, // Expiry time of the token
    pub iat: usize, // Issued at time of the token
    pub sub: String, // Id of the authenticated user
}

/// Issues a session token for `user_id`, valid for 24 hours.
pub fn encode_jwt(user_id: Uuid, jwt_secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let expire = chrono::Duration::hours(24);
    let claims = Claims {
        exp: (now + expire).timestamp() as usize,
        iat: now.timestamp() as usize,
        sub: user_id.to_string(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
}

pub fn decode_jwt(token: &str, jwt_secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

fn bearer_user_id(headers: &HeaderMap, jwt_secret: &str) -> Option<Uuid> {
    let token = headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?;
    let claims = decode_jwt(token, jwt_secret).ok()?;
    Uuid::parse_str(&claims.sub).ok()
}

/// Sets the CurrentUser extension when a valid Bearer token is presented.
///
/// The user is reloaded from the store so a role change takes effect on
/// the next request. Tokens for deleted users are ignored. Rejecting
/// anonymous callers is left to the handlers.
pub async fn auth_user_middleware(
    State(state): State<Arc<AuthState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(user_id) = bearer_user_id(&headers, &state.jwt_secret) {
        let user = match UserStore::open(&state.db).await {
            Ok(store) => store.get_user_by_id(user_id).await,
            Err(err) => Err(err),
        };
        match user {
            Ok(user) => {
                request.extensions_mut().insert(CurrentUser(user));
            }
            Err(StoreError::NotFound(_)) => {
                tracing::info!("Ignoring session of missing user {}", user_id);
            }
            Err(err) => return ApiError::from(err).into_response(),
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_round_trip_session_subject() {
        let id = Uuid::new_v4();
        let token = encode_jwt(id, "some_secret").unwrap();
        let claims = decode_jwt(&token, "some_secret").unwrap();
        assert_eq!(claims.sub, id.to_string());
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn can_reject_token_signed_with_other_secret() {
        let token = encode_jwt(Uuid::new_v4(), "some_secret").unwrap();
        assert!(decode_jwt(&token, "other_secret").is_err());
    }

    #[test]
    fn can_read_bearer_header() {
        let id = Uuid::new_v4();
        let token = encode_jwt(id, "some_secret").unwrap();

        let mut headers = HeaderMap::new();
        assert_eq!(bearer_user_id(&headers, "some_secret"), None);

        headers.insert("authorization", format!("Bearer {token}").parse().unwrap());
        assert_eq!(bearer_user_id(&headers, "some_secret"), Some(id));

        headers.insert("authorization", token.parse().unwrap());
        assert_eq!(bearer_user_id(&headers, "some_secret"), None);
    }
}
