//! HTTP application wiring (Axum router + shared state).
//!
//! - `routes/`: HTTP handlers, one file per area
//! - `dto.rs`: request/response bodies
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;

use authgate_infra::{AccountStore, SessionService};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;

/// Session facade over a type-erased store, as served over HTTP.
pub type Gateway = SessionService<Arc<dyn AccountStore>>;

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Gateway>,
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(session: Arc<Gateway>) -> Router {
    let state = AppState { session };

    // Protected routes: require a verified session token.
    let protected = Router::new()
        .route("/session", get(routes::session::current))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::session_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/register", post(routes::local::register))
        .route("/login", post(routes::local::login))
        .route("/login/steam/:id", get(routes::providers::steam))
        .route("/login/discord", get(routes::providers::discord_redirect))
        .route("/login/discord/callback", get(routes::providers::discord_callback))
        .merge(protected)
        .with_state(state)
        .layer(ServiceBuilder::new())
}
