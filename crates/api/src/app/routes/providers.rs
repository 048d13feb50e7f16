use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
    Json,
};

use crate::app::{dto, errors, AppState};

pub async fn steam(State(state): State<AppState>, Path(id): Path<String>) -> axum::response::Response {
    match state.session.login_with_steam(&id).await {
        Ok(login) => Json(dto::ProviderLoginResponse::from(login)).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

pub async fn discord_redirect(State(state): State<AppState>) -> axum::response::Response {
    match state.session.discord_authorize_url() {
        Ok(url) => Redirect::temporary(&url).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

pub async fn discord_callback(
    State(state): State<AppState>,
    Query(query): Query<dto::CallbackQuery>,
) -> axum::response::Response {
    let code = query.code.unwrap_or_default();
    match state.session.login_with_discord(&code).await {
        Ok(login) => Json(dto::ProviderLoginResponse::from(login)).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}
