// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::AuthError;
use crate::database::{DatabaseError, StoreError};
use crate::filter::error::FilterError;
use crate::license::LicenseError;

/// HTTP API error with the status codes the kanban clients expect
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },
    MissingArgument(String),
    InvalidJson(String),

    // 403 Forbidden. Zero identifiers and duplicate resources keep 403 for client compatibility.
    InvalidValue(String),
    InvalidNonce(String),
    Forbidden(String),
    Conflict(String),

    // 404 Not Found (reads that matched nothing and writes that failed)
    NotFound(String),

    // 405 Method Not Allowed (capability check failed)
    PermissionDenied(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 502 Bad Gateway (license server issues)
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
            ApiError::MissingArgument(_) => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::InvalidValue(_) => 403,
            ApiError::InvalidNonce(_) => 403,
            ApiError::Forbidden(_) => 403,
            ApiError::Conflict(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::PermissionDenied(_) => 405,
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
            ApiError::MissingArgument(msg) => msg,
            ApiError::InvalidJson(msg) => msg,
            ApiError::InvalidValue(msg) => msg,
            ApiError::InvalidNonce(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::PermissionDenied(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::BadGateway(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut response = json!({
            "code": self.error_code(),
            "message": self.message(),
            "data": { "status": self.status_code() }
        });

        if let ApiError::ValidationError { field_errors: Some(field_errors), .. } = self {
            response["field_errors"] = json!(field_errors);
        }

        response
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "rest_invalid_param",
            ApiError::ValidationError { .. } => "rest_invalid_param",
            ApiError::MissingArgument(_) => "rest_missing_callback_param",
            ApiError::InvalidJson(_) => "rest_invalid_json",
            ApiError::InvalidValue(_) => "invalid_value",
            ApiError::InvalidNonce(_) => "rest_cookie_invalid_nonce",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::Conflict(_) => "conflict",
            ApiError::NotFound(_) => "not_found",
            ApiError::PermissionDenied(_) => "invalid-method",
            ApiError::InternalServerError(_) => "internal_error",
            ApiError::BadGateway(_) => "license_server_error",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(
        message: impl Into<String>,
        field_errors: Option<HashMap<String, String>>,
    ) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    /// Validation error pointing at a single request argument
    pub fn invalid_param(field: &str, reason: impl Into<String>) -> Self {
        let mut field_errors = HashMap::new();
        field_errors.insert(field.to_string(), reason.into());
        ApiError::validation_error(format!("Invalid parameter(s): {}", field), Some(field_errors))
    }

    pub fn missing_argument(field: &str) -> Self {
        ApiError::MissingArgument(format!("Missing parameter(s): {}", field))
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    /// The identifier was zero or otherwise unusable
    pub fn invalid_value() -> Self {
        ApiError::InvalidValue("Invaild value passed.".to_string())
    }

    pub fn invalid_value_msg(message: impl Into<String>) -> Self {
        ApiError::InvalidValue(message.into())
    }

    pub fn invalid_nonce() -> Self {
        ApiError::InvalidNonce("Cookie check failed".to_string())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        ApiError::PermissionDenied(message.into())
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

// Convert other error types to ApiError
impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Store(store_err) => store_err.into(),
            other => {
                tracing::error!("Database error: {}", other);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        DatabaseError::from(err).into()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::not_found("Not Found"),
            StoreError::QueryFailed { table, source } => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Query on {} failed: {}", table, source);
                ApiError::not_found("Not Found")
            }
            StoreError::WriteFailed { table, source } => {
                tracing::error!("Write to {} failed: {}", table, source);
                ApiError::not_found("Not Found")
            }
            StoreError::UnknownColumn(column) => {
                ApiError::invalid_param(&column, "Unknown field")
            }
            StoreError::InvalidValue { column, reason } => ApiError::invalid_param(&column, reason),
            StoreError::MissingKey(column) => ApiError::missing_argument(&column),
            StoreError::Filter(filter_err) => filter_err.into(),
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::InvalidOrder(value) => ApiError::invalid_param("order", value),
            FilterError::InvalidColumn(column) => ApiError::invalid_param(&column, "Invalid field name"),
            FilterError::TooManyConditions(count) => {
                ApiError::bad_request(format!("At most 3 filter fields are supported, got {}", count))
            }
            other => {
                tracing::error!("Filter error: {}", other);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken(msg) => {
                tracing::warn!("Rejected nonce: {}", msg);
                ApiError::invalid_nonce()
            }
            AuthError::MissingSecret => {
                tracing::error!("Nonce secret not configured");
                ApiError::invalid_nonce()
            }
            AuthError::TokenGeneration(msg) => ApiError::internal_server_error(msg),
        }
    }
}

impl From<LicenseError> for ApiError {
    fn from(err: LicenseError) -> Self {
        match err {
            LicenseError::Remote(msg) => {
                tracing::error!("License server error: {}", msg);
                ApiError::bad_gateway("License server is unreachable")
            }
            LicenseError::Store(store_err) => store_err.into(),
            e @ LicenseError::AlreadyExists => ApiError::conflict(e.to_string()),
            other => ApiError::forbidden(other.to_string()),
        }
    }
}

// Standard error trait implementations
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compatibility_status_codes() {
        assert_eq!(ApiError::invalid_value().status_code(), 403);
        assert_eq!(ApiError::conflict("exists").status_code(), 403);
        assert_eq!(ApiError::permission_denied("nope").status_code(), 405);
        assert_eq!(ApiError::not_found("Not Found").status_code(), 404);
        assert_eq!(ApiError::missing_argument("board_id").status_code(), 400);
    }

    #[test]
    fn store_failures_surface_as_not_found() {
        let err: ApiError = StoreError::WriteFailed {
            table: "wp_wpnakama_boards".to_string(),
            source: sqlx::Error::RowNotFound,
        }
        .into();
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.error_code(), "not_found");
    }

    #[test]
    fn validation_error_carries_field_errors() {
        let body = ApiError::invalid_param("board_id", "Must be a number").to_json();
        assert_eq!(body["code"], "rest_invalid_param");
        assert_eq!(body["data"]["status"], 400);
        assert_eq!(body["field_errors"]["board_id"], "Must be a number");
    }
}
