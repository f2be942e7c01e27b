use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::{verify_nonce, Session, NONCE_HEADER};
use crate::error::ApiError;
use crate::state::AppState;

/// Resolve the `X-WP-Nonce` header into a `Session` extension.
///
/// No header means an anonymous session; a header that fails verification is rejected outright.
pub async fn session_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let session = match resolve_session(&state, request.headers()) {
        Ok(session) => session,
        Err(err) => return err.into_response(),
    };
    request.extensions_mut().insert(session);
    next.run(request).await
}

fn resolve_session(state: &AppState, headers: &HeaderMap) -> Result<Session, ApiError> {
    let Some(value) = headers.get(NONCE_HEADER) else {
        return Ok(Session::anonymous());
    };
    let token = value.to_str().map_err(|_| ApiError::invalid_nonce())?.trim();
    if token.is_empty() {
        return Ok(Session::anonymous());
    }

    let claims = verify_nonce(&state.config.security, token).map_err(|e| {
        tracing::warn!("Rejected request nonce: {}", e);
        ApiError::invalid_nonce()
    })?;
    Ok(Session::from(claims))
}
