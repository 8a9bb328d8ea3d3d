use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};
use serde_json::Value;
use thiserror::Error;

use crate::models::ApiResponse;

/// RepoError
///
/// Failure surface of the `Repository` boundary. `UniqueViolation` is the one
/// variant callers branch on: it is how a composite-key conflict (e.g. two
/// concurrent enrollment inserts racing past the existence check) reaches the
/// engine so it can be reported as the canonical invariant violation instead
/// of leaking as a raw store error.
#[derive(Debug, Error)]
pub enum RepoError {
    /// A primary-key or unique-constraint conflict on insert.
    #[error("unique constraint violated")]
    UniqueViolation,

    /// Any other store failure (connectivity, syntax, decode).
    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        // Postgres unique_violation is SQLSTATE 23505.
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some("23505") {
                return RepoError::UniqueViolation;
            }
        }
        RepoError::Database(err.to_string())
    }
}

/// ApiError
///
/// The operation-level error taxonomy. Every engine failure is one of these
/// kinds; the message strings are part of the observable contract and are
/// surfaced verbatim inside the `{ message, data: null }` envelope.
///
/// Kind → status mapping:
/// - `NotFound`   → 404 (missing User/Cohort/Post/Comment)
/// - `Invariant`  → 400 (course not in cohort, already enrolled, empty content, ...)
/// - `Forbidden`  → 403 (role/ownership denial from the policy table)
/// - `Conflict`   → 409 (duplicate registration)
/// - `Internal`   → 500 (store failure; message not echoed to the client)
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Invariant(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Invariant(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Store failures are logged with detail but reported generically.
        let message = match &self {
            ApiError::Internal(detail) => {
                tracing::error!("internal failure: {detail}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ApiResponse::<Value> {
            message,
            data: None,
        };
        (status, Json(body)).into_response()
    }
}
