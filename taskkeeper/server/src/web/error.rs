use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use taskkeeper_core::{AuthorizationError, ValidationError};
use uuid::Uuid;

use crate::store::StoreError;

/// JSON body of every API error.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
        }
    }
}

/// Error type for API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A request that is well-formed but asks for nothing, e.g. an empty patch.
    #[error("{0}")]
    BadRequest(&'static str),
    /// No valid session was presented.
    #[error("Authentication required to access this resource")]
    Unauthenticated,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Failed to generate authentication token")]
    Token(#[from] jsonwebtoken::errors::Error),
    /// A body field that did not decode into its declared type.
    #[error("{message}")]
    BodyField { field: String, message: String },
    /// A body that is not JSON, or not sent as JSON.
    #[error("{}", .0.body_text())]
    Body(JsonRejection),
}

/// JSON request body whose decoding failures surface as [`ApiError`].
pub type JsonBody<T> = WithRejection<Json<T>, ApiError>;

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let decoded = match &rejection {
            JsonRejection::JsonDataError(_) => std::iter::successors(
                Some(&rejection as &(dyn std::error::Error + 'static)),
                |&err| err.source(),
            )
            .find_map(|err| err.downcast_ref::<serde_path_to_error::Error<serde_json::Error>>())
            .map(|err| {
                let inner = err.inner();
                let location = format!(" at line {} column {}", inner.line(), inner.column());
                let detail = inner.to_string();
                let detail = detail.strip_suffix(&location).unwrap_or(&detail).to_string();
                let field = match err.path().to_string() {
                    path if path == "." => "body".to_string(),
                    path => path,
                };
                (field, detail)
            }),
            _ => None,
        };

        match decoded {
            Some((field, detail)) => {
                let message = if detail.starts_with(&field) {
                    detail
                } else {
                    format!("{field}: {detail}")
                };
                ApiError::BodyField { field, message }
            }
            None => ApiError::Body(rejection),
        }
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) | ApiError::Store(StoreError::Validation(_)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            ApiError::Authorization(AuthorizationError::Forbidden { .. }) => {
                (StatusCode::FORBIDDEN, "FORBIDDEN")
            }
            ApiError::Authorization(AuthorizationError::Unauthorized { .. }) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED")
            }
            ApiError::Store(StoreError::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Store(StoreError::Conflict(_)) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Store(StoreError::Unavailable(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
            }
            ApiError::Store(StoreError::Database(_) | StoreError::Internal(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
            ApiError::Token(_) => (StatusCode::INTERNAL_SERVER_ERROR, "JWT_ERROR"),
            ApiError::BodyField { .. } | ApiError::Body(JsonRejection::JsonDataError(_)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            ApiError::Body(JsonRejection::MissingJsonContentType(_)) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_MEDIA_TYPE")
            }
            ApiError::Body(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        (status, Json(ErrorResponse::new(code, self.to_string()))).into_response()
    }
}

/// Parses an identity taken from a path or query string.
pub fn parse_id(field: &'static str, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::Validation(ValidationError::new(field, "uuid")))
}
