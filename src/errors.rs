use axum::http::StatusCode;
use tracing::error;

/// Rejection returned by every handler.
pub type ApiError = (StatusCode, String);

pub fn internal<E: std::fmt::Display>(e: E) -> ApiError {
    error!(error = %e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

pub fn bad_request(msg: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, msg.into())
}

pub fn not_found(what: &str) -> ApiError {
    (StatusCode::NOT_FOUND, format!("{what} not found"))
}

pub fn forbidden(msg: impl Into<String>) -> ApiError {
    (StatusCode::FORBIDDEN, msg.into())
}

/// True when the error chain bottoms out in a Postgres unique-constraint violation.
pub fn is_unique_violation(e: &anyhow::Error) -> bool {
    e.downcast_ref::<sqlx::Error>()
        .and_then(|err| err.as_database_error())
        .is_some_and(|db| db.is_unique_violation())
}
