use axum::{
    extract::{Extension, State},
    response::IntoResponse,
    Json,
};

use crate::app::{errors, AppState};
use crate::context::SessionContext;

/// Live projection of the account behind the presented token.
pub async fn current(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
) -> axum::response::Response {
    match state.session.user_detail(ctx.claims()).await {
        Ok(detail) => Json(detail).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}
