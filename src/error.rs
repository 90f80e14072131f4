//! Error handling for the API.
//!
//! Every fallible operation in the crate returns a [`NausResult`]. Prefer adding
//! a new variant over squeezing a failure into [`NausError::Internal`], since
//! each variant maps to its own status code and machine-readable error code.

use async_graphql::ErrorExtensions;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

const UNIQUE_VIOLATION: &str = "23505";

/// The error enum for all error handling across the API.
///
/// See each variant for its corresponding status code.
#[derive(Debug, Error)]
pub enum NausError {
    /// \[400\] A required field was missing or malformed.
    #[error("{message}")]
    Validation { field: String, message: String },
    /// \[404\] No record matched the given id, email or membership number.
    #[error("{0}")]
    NotFound(String),
    /// \[409\] A unique constraint (email or membership number) would be violated.
    #[error("{0}")]
    Conflict(String),
    /// \[409\] The record is not in a state that allows the requested transition.
    #[error("{0}")]
    InvalidState(String),
    /// \[401\] The caller is not logged in or supplied bad credentials.
    #[error("{0}")]
    Unauthorized(String),
    /// \[403\] The caller is logged in but may not perform the action.
    #[error("{0}")]
    Forbidden(String),
    /// \[500\] The membership number sequence could not be advanced.
    #[error("membership number allocation failed: {0}")]
    Allocation(String),
    /// \[500\] The database was unreachable or rejected a write.
    #[error("database error: {0}")]
    Persistence(#[source] sqlx::Error),
    /// \[500\] Anything else that went wrong on our side.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// The return type for all fallible operations.
pub type NausResult<T> = Result<T, NausError>;

impl NausError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        NausError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        NausError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        NausError::Conflict(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        NausError::InvalidState(message.into())
    }

    pub fn status(&self) -> u16 {
        match self {
            NausError::Validation { .. } => 400,
            NausError::Unauthorized(_) => 401,
            NausError::Forbidden(_) => 403,
            NausError::NotFound(_) => 404,
            NausError::Conflict(_) | NausError::InvalidState(_) => 409,
            NausError::Allocation(_) | NausError::Persistence(_) | NausError::Internal(_) => 500,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            NausError::Validation { .. } => "VALIDATION_ERROR",
            NausError::NotFound(_) => "NOT_FOUND",
            NausError::Conflict(_) => "CONFLICT",
            NausError::InvalidState(_) => "INVALID_STATE",
            NausError::Unauthorized(_) => "UNAUTHORIZED",
            NausError::Forbidden(_) => "FORBIDDEN",
            NausError::Allocation(_) => "ALLOCATION_FAILURE",
            NausError::Persistence(_) => "PERSISTENCE_FAILURE",
            NausError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            NausError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }

    pub fn is_internal(&self) -> bool {
        self.status() >= 500
    }

    /// The message shown to clients. Internal failures never leak their cause here.
    pub fn public_message(&self) -> String {
        match self {
            NausError::Allocation(_) => "Unable to allocate a membership number".to_owned(),
            NausError::Persistence(_) | NausError::Internal(_) => {
                "An internal server error occurred".to_owned()
            }
            other => other.to_string(),
        }
    }

    /// Wraps a store failure raised while advancing the membership sequence.
    pub fn allocation(source: NausError) -> Self {
        match source {
            NausError::Persistence(err) => NausError::Allocation(err.to_string()),
            other => other,
        }
    }

    /// The status code and JSON body for this error.
    ///
    /// `detail` is only included when `diagnostics` is on.
    pub fn as_response(&self, diagnostics: bool) -> (u16, Value) {
        let mut body = json!({
            "statusCode": self.status(),
            "code": self.code(),
            "message": self.public_message(),
        });
        if let Some(field) = self.field() {
            body["field"] = json!(field);
        }
        if diagnostics && self.is_internal() {
            body["detail"] = json!(format!("{:?}", self));
        }

        (self.status(), body)
    }

    fn log(&self) {
        if self.is_internal() {
            error!(code = self.code(), error = ?self, "request failed");
        }
    }
}

impl From<sqlx::Error> for NausError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => NausError::NotFound("Record not found".to_owned()),
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                NausError::Conflict("A record with the same unique value already exists".to_owned())
            }
            _ => NausError::Persistence(err),
        }
    }
}

impl ErrorExtensions for NausError {
    fn extend(&self) -> async_graphql::Error {
        self.log();

        async_graphql::Error::new(self.public_message()).extend_with(|_, extensions| {
            extensions.set("code", self.code());
            extensions.set("statusCode", i32::from(self.status()));
            if let Some(field) = self.field() {
                extensions.set("field", field);
            }
            if self.is_internal() {
                extensions.set("detail", format!("{:?}", self));
            }
        })
    }
}

/// Errors that escape the GraphQL executor, like a malformed token header.
///
/// These never carry internal detail since no request context is available.
impl IntoResponse for NausError {
    fn into_response(self) -> Response {
        self.log();
        let (status, body) = self.as_response(false);
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_name_their_field() {
        let (status, body) = NausError::validation("email", "Email is required").as_response(true);

        assert_eq!(status, 400);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["field"], "email");
        assert!(body.get("detail").is_none());
    }

    #[test]
    fn internal_detail_only_shown_with_diagnostics() {
        let error = NausError::Internal(anyhow::anyhow!("disk on fire"));

        let (_, production) = error.as_response(false);
        assert_eq!(production["message"], "An internal server error occurred");
        assert!(production.get("detail").is_none());

        let (_, development) = error.as_response(true);
        assert!(development["detail"]
            .as_str()
            .unwrap()
            .contains("disk on fire"));
    }
}
