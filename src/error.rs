// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::AuthError;
use crate::cloudflare::CloudflareError;
use crate::database::manager::DatabaseError;
use crate::services::{CloudflareConfigError, IncidentError, PageError};

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },
    CloudflareNotConfigured(String),
    ConnectivityFailed {
        message: String,
        report: Value,
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 502 Bad Gateway (Cloudflare step failures)
    BadGateway(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::CloudflareNotConfigured(_) => 400,
            ApiError::ConnectivityFailed { .. } => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::InternalServerError(_) => 500,
            ApiError::BadGateway(_) => 502,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::CloudflareNotConfigured(msg) => msg,
            ApiError::ConnectivityFailed { message, .. } => message,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::BadGateway(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut response = json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        });
        match self {
            ApiError::ValidationError {
                field_errors: Some(field_errors),
                ..
            } => {
                response["field_errors"] = json!(field_errors);
            }
            ApiError::ConnectivityFailed { report, .. } => {
                response["report"] = report.clone();
            }
            _ => {}
        }
        response
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::CloudflareNotConfigured(_) => "CLOUDFLARE_NOT_CONFIGURED",
            ApiError::ConnectivityFailed { .. } => "CLOUDFLARE_TEST_FAILED",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::BadGateway(_) => "BAD_GATEWAY",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, field_errors: Option<HashMap<String, String>>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        ApiError::BadGateway(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::Conflict(msg) => ApiError::conflict(msg),
            DatabaseError::Invalid(msg) => ApiError::validation_error(msg, None),
            DatabaseError::ConfigMissing(name) => {
                tracing::error!("Database configuration missing: {}", name);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::QueryError(msg) => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Database query error: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            DatabaseError::Sqlx(sqlx::Error::PoolTimedOut) => {
                tracing::error!("Database pool timed out");
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
            DatabaseError::Migration(e) => {
                tracing::error!("Migration error: {}", e);
                ApiError::service_unavailable("Service is being updated, please try again later")
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        DatabaseError::Sqlx(err).into()
    }
}

impl From<CloudflareError> for ApiError {
    fn from(err: CloudflareError) -> Self {
        match err {
            CloudflareError::Configuration(msg) => ApiError::CloudflareNotConfigured(msg),
            CloudflareError::Serialization(e) => {
                tracing::error!("Edge record serialization failed: {}", e);
                ApiError::internal_server_error("Failed to build edge record")
            }
            other => {
                tracing::warn!("Cloudflare operation failed: {}", other);
                ApiError::bad_gateway(other.to_string())
            }
        }
    }
}

impl From<CloudflareConfigError> for ApiError {
    fn from(err: CloudflareConfigError) -> Self {
        match err {
            CloudflareConfigError::Validation(msg) => ApiError::validation_error(msg, None),
            CloudflareConfigError::TestFailed { message, report } => ApiError::ConnectivityFailed {
                message: format!("Cloudflare connectivity test failed: {}", message),
                report: serde_json::to_value(report).unwrap_or(Value::Null),
            },
            CloudflareConfigError::Cloudflare(e) => e.into(),
            CloudflareConfigError::Database(e) => e.into(),
        }
    }
}

impl From<PageError> for ApiError {
    fn from(err: PageError) -> Self {
        match err {
            PageError::NotFound => ApiError::not_found("Page not found"),
            PageError::Validation(fields) => ApiError::validation_error("Invalid page", Some(fields)),
            e @ (PageError::LimitReached(_) | PageError::ViewLimitReached) => ApiError::forbidden(e.to_string()),
            PageError::Database(e) => e.into(),
        }
    }
}

impl From<IncidentError> for ApiError {
    fn from(err: IncidentError) -> Self {
        match err {
            e @ (IncidentError::NotFound | IncidentError::PageNotFound) => ApiError::not_found(e.to_string()),
            e @ IncidentError::PlanRequired => ApiError::forbidden(e.to_string()),
            IncidentError::Validation(msg) => ApiError::validation_error(msg, None),
            IncidentError::Transition(e) => ApiError::bad_request(e.to_string()),
            IncidentError::Database(e) => e.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            e @ (AuthError::InvalidCredentials | AuthError::InvalidToken(_)) => ApiError::unauthorized(e.to_string()),
            e @ AuthError::AccountDisabled => ApiError::forbidden(e.to_string()),
            e @ AuthError::EmailTaken => ApiError::conflict(e.to_string()),
            e @ AuthError::WeakPassword(_) => ApiError::validation_error(e.to_string(), None),
            AuthError::Database(e) => e.into(),
            other => {
                tracing::error!("Authentication failure: {}", other);
                ApiError::internal_server_error("Authentication service error")
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
