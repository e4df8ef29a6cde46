//! Response envelopes and error mapping.
//!
//! # Error body
//! ```json
//! { "success": false,
//!   "error": { "code": "CONFLICT", "message": "...", "details": {...}, "timestamp": "..." } }
//! ```
//! `details` is only populated in development. Backend failures never leak
//! their cause to clients outside development.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::Environment;
use crate::store::{StoreError, UserProfile};

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    InvalidRequest,
    AuthenticationError,
    NotFound,
    Conflict,
    DatabaseError,
    RateLimitError,
    InternalError,
}

/// Error returned by handlers, rendered as the JSON error envelope.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn invalid_credentials() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            ErrorCode::AuthenticationError,
            "Invalid email or password",
        )
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, ErrorCode::NotFound, format!("{} not found", resource))
    }

    pub fn rate_limited() -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::RateLimitError,
            "Too many requests, please try again later",
        )
    }

    pub fn invalid_body(reason: impl std::fmt::Display) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorCode::InvalidRequest, "Malformed request body")
            .with_details(json!({ "error": reason.to_string() }))
    }

    /// Map a store error. Diagnostic detail is kept only in development.
    pub fn from_store(err: StoreError, environment: Environment) -> Self {
        let api = match &err {
            StoreError::Validation(errors) => {
                let message = "Validation failed";
                return Self::new(StatusCode::BAD_REQUEST, ErrorCode::ValidationError, message)
                    .with_details(json!({ "errors": errors }));
            }
            StoreError::DuplicateEmail(_) => {
                Self::new(StatusCode::CONFLICT, ErrorCode::Conflict, "Email already registered")
            }
            StoreError::BackendUnavailable { .. }
            | StoreError::Rejected { .. }
            | StoreError::CircuitOpen(_)
            | StoreError::ReadOnly(_) => {
                tracing::error!(error = %err, "Storage failure");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DatabaseError,
                    "Database operation failed",
                )
            }
            StoreError::Hashing(_) => {
                tracing::error!(error = %err, "Password hashing failure");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::InternalError,
                    "An unexpected error occurred",
                )
            }
        };

        if environment.is_development() {
            api.with_details(json!({ "error": err.to_string() }))
        } else {
            api
        }
    }

    /// Drop details unless running in development. Validation messages are
    /// user-facing and always kept.
    pub fn for_environment(mut self, environment: Environment) -> Self {
        if !environment.is_development() && self.code != ErrorCode::ValidationError {
            self.details = None;
        }
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut error = json!({
            "code": self.code,
            "message": self.message,
            "timestamp": Utc::now().to_rfc3339(),
        });
        if let Some(details) = self.details {
            error["details"] = details;
        }
        (self.status, Json(json!({ "success": false, "error": error }))).into_response()
    }
}

/// Successful response carrying a user projection.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub user: UserProfile,
}

impl UserResponse {
    pub fn new(user: UserProfile) -> Self {
        Self {
            success: true,
            message: None,
            user,
        }
    }

    pub fn with_message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }
}
