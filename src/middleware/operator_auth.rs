use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::db::AppState;
use crate::error::AppError;
use crate::util::extract_bearer_token;

/// Check the bearer token against the configured operator secret.
fn authenticate_operator(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(secret) = state.api_secret.as_deref() else {
        tracing::error!("API_SECRET not configured, rejecting operator request");
        return Err(AppError::Unauthorized);
    };

    let token = extract_bearer_token(headers).ok_or(AppError::Unauthorized)?;

    // Secret length is not sensitive; contents are compared in constant time
    if token.len() != secret.len() || !bool::from(token.as_bytes().ct_eq(secret.as_bytes())) {
        tracing::debug!("Operator request rejected: bearer token mismatch");
        return Err(AppError::Unauthorized);
    }

    Ok(())
}

pub async fn operator_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    authenticate_operator(&state, request.headers())?;
    Ok(next.run(request).await)
}
