use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::app::{dto, errors, AppState};

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<dto::RegisterRequest>,
) -> axum::response::Response {
    match state.session.register(body.into()).await {
        Ok(account) => (
            StatusCode::CREATED,
            Json(dto::RegisteredResponse { id: account.id }),
        )
            .into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    match state.session.login(&body.username, &body.password).await {
        Ok(login) => Json(dto::TokenResponse { token: login.token }).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}
