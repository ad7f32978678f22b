use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sea_orm::DbErr;
use thiserror::Error;
use tracing::{error, warn};

use model::entities::user::Role;

use crate::schemas::ErrorResponse;

/// What exactly failed inside the authentication path. Kinds are kept
/// for logging and tests; every one of them collapses into the same
/// generic 401 so callers cannot probe account state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    MissingToken,
    InvalidToken,
    MalformedToken,
    UnknownUser,
    /// The role embedded in the token no longer matches the stored role.
    /// The token caches the role at issuance time; the live record wins.
    RoleMismatch,
}

/// Failure taxonomy for the whole API surface.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("please authenticate")]
    Unauthenticated(AuthFailure),
    #[error("invalid phone number or password")]
    InvalidCredentials,
    #[error("access restricted to: {}", format_roles(.0))]
    Forbidden(&'static [Role]),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    DuplicateRequest(String),
    #[error("{0}")]
    AlreadyCancelled(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("internal server error")]
    Database(#[from] DbErr),
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

fn format_roles(roles: &[Role]) -> String {
    roles
        .iter()
        .map(Role::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::DuplicateRequest(_)
            | ApiError::AlreadyCancelled(_)
            | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated(_) => "UNAUTHENTICATED",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::DuplicateRequest(_) => "DUPLICATE_REQUEST",
            ApiError::AlreadyCancelled(_) => "ALREADY_CANCELLED",
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Database(_) | ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Internal detail is logged here and never sent to the caller.
        match &self {
            ApiError::Unauthenticated(kind) => warn!("authentication failed: {kind:?}"),
            ApiError::Database(err) => error!("database error: {err}"),
            ApiError::Internal(err) => error!("internal error: {err:#}"),
            _ => {}
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
            success: false,
        };

        (self.status_code(), Json(body)).into_response()
    }
}
