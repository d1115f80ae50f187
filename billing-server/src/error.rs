//! Unified service-layer error type
//!
//! `ServiceError` bridges storage errors (`RepoError`) and the API-layer
//! error (`AppError`), so engine code can use `?` on both.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

use crate::db::RepoError;

/// Service-layer error, two variants only.
///
/// - `Repo`: storage failure (logged, mapped to `DatabaseError`)
/// - `App`: business-rule error (passed through to the client)
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    App(#[from] AppError),
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Repo(RepoError::NotFound(what)) => AppError::not_found(what),
            ServiceError::Repo(RepoError::Duplicate(what)) => {
                AppError::with_message(ErrorCode::AlreadyExists, what)
            }
            ServiceError::Repo(repo_err) => {
                tracing::error!(error = %repo_err, "Service storage error");
                AppError::new(ErrorCode::DatabaseError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

/// Convenience type alias for service-layer results
pub type ServiceResult<T> = Result<T, ServiceError>;
