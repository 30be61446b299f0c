//! Failure kinds shared by the user and task stores.

use sea_orm::{DatabaseConnection, DbErr, SqlErr};
use taskkeeper_core::ValidationError;

/// Error type for store operations.
///
/// Each variant is a distinct kind so the handler layer can pick a status
/// code without looking at the message.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The inbound document broke a validation rule.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// No record matched, including records hidden by scope narrowing.
    #[error("{0} not found")]
    NotFound(&'static str),
    /// A unique field collided with another record.
    #[error("{0}")]
    Conflict(String),
    /// The liveness check against the store failed.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    /// Any other store failure, with the driver's message.
    #[error("Database error: {0}")]
    Database(DbErr),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(message)) => StoreError::Conflict(message),
            _ => StoreError::Database(err),
        }
    }
}

impl StoreError {
    /// Maps the "no row" errors of sea-orm updates to `NotFound`.
    pub(crate) fn missing_as(resource: &'static str) -> impl Fn(DbErr) -> StoreError {
        move |err| match err {
            DbErr::RecordNotFound(_) | DbErr::RecordNotUpdated => StoreError::NotFound(resource),
            other => StoreError::from(other),
        }
    }
}

/// Probes the connection before any work is issued.
#[tracing::instrument(skip(db))]
pub(crate) async fn ensure_live(db: &DatabaseConnection) -> Result<(), StoreError> {
    db.ping().await.map_err(|err| {
        tracing::error!("Store liveness check failed: {}", err);
        StoreError::Unavailable(err.to_string())
    })
}
