use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use authgate_auth::AuthError;

use crate::app::{errors, AppState};
use crate::context::SessionContext;

pub async fn session_middleware(
    State(state): State<AppState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = authorization(req.headers()).map_err(errors::auth_error_to_response)?;

    let claims = state
        .session
        .verify(token)
        .map_err(errors::auth_error_to_response)?;

    req.extensions_mut().insert(SessionContext::new(claims));

    Ok(next.run(req).await)
}

/// Raw `Authorization` value; the `Bearer ` scheme is optional and stripped
/// by the verifier.
fn authorization(headers: &HeaderMap) -> Result<&str, AuthError> {
    let missing = || AuthError::TokenMalformed("missing session token".to_string());

    headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(missing)?
        .to_str()
        .map_err(|_| missing())
}
