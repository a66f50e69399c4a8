/// Error taxonomy for the messaging API.
/// Every failure a handler can produce maps to one stable status code so
/// callers can branch on failure kind without parsing messages.
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed or contradictory request (empty field, both-or-neither
    /// recipient fields).
    #[error("invalid request: {0}")]
    InvalidInput(String),

    /// A referenced user, group, or message does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Uniqueness violation on username or groupname.
    #[error("{0}")]
    Conflict(String),

    /// I/O or transaction failure from the persistence layer.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl ApiError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        ApiError::InvalidInput(reason.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ApiError::NotFound(what.into())
    }

    /// Classify a write failure: the unique constraint is the authoritative
    /// guard against duplicate names, so a UNIQUE violation from the insert
    /// itself becomes `Conflict` even when the pre-check passed.
    pub fn conflict_on_unique(err: rusqlite::Error, message: &str) -> Self {
        if is_unique_violation(&err) {
            ApiError::Conflict(message.to_string())
        } else {
            ApiError::Storage(err)
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::Storage(err) => {
                log::error!("storage failure: {}", err);
                json!({ "error": "internal storage error" })
            }
            other => json!({ "error": other.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
