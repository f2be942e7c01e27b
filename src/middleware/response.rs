use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Map, Value};

/// Successful handler output
#[derive(Debug)]
pub enum Reply {
    /// Raw read result: a row, rows or a keyed map
    Json(Value),
    /// Paginated listing; totals go into `X-WP-Total` / `X-WP-TotalPages`
    Listing { data: Value, total: i64, total_pages: i64 },
    /// Mutation envelope `{status, message, data}`
    Message { status: u16, message: String, data: Value },
}

impl Reply {
    pub fn json(data: Value) -> Self {
        Reply::Json(data)
    }

    pub fn listing(data: Value, total: i64, total_pages: i64) -> Self {
        Reply::Listing { data, total, total_pages }
    }

    pub fn message(message: impl Into<String>, data: Value) -> Self {
        Reply::Message { status: 200, message: message.into(), data }
    }

    /// Insert result carrying the new key under its field name
    pub fn added(key_field: &str, id: impl Into<Value>) -> Self {
        let mut data = Map::new();
        data.insert(key_field.to_string(), id.into());
        Self::message("Successfully, added the record.", Value::Object(data))
    }

    pub fn updated(data: Value) -> Self {
        Self::message("Successfully, updated the record.", data)
    }

    pub fn deleted(data: Value) -> Self {
        Self::message("Successfully, deleted the record.", data)
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Json(data) => (StatusCode::OK, Json(data)).into_response(),
            Reply::Listing { data, total, total_pages } => {
                let mut response = (StatusCode::OK, Json(data)).into_response();
                let headers = response.headers_mut();
                headers.insert("X-WP-Total", HeaderValue::from(total));
                headers.insert("X-WP-TotalPages", HeaderValue::from(total_pages));
                response
            }
            Reply::Message { status, message, data } => {
                let code = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
                let envelope = json!({
                    "status": status,
                    "message": message,
                    "data": data,
                });
                (code, Json(envelope)).into_response()
            }
        }
    }
}

pub type ApiResult<T = Reply> = Result<T, crate::error::ApiError>;
