//! PullDeck control server
//!
//! A small JSON API over the download engine. Everything under `/api`
//! except `login` requires a session cookie obtained from `/api/login`.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use pulldeck_core::{PullDeckCore, SessionStore};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub core: PullDeckCore,
    pub sessions: Arc<dyn SessionStore>,
    password: Arc<str>,
}

impl AppState {
    pub fn new(core: PullDeckCore, sessions: Arc<dyn SessionStore>, password: &str) -> Self {
        Self {
            core,
            sessions,
            password: Arc::from(password),
        }
    }

    pub fn check_password(&self, candidate: &str) -> bool {
        *self.password == *candidate
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/downloads", get(routes::list_transfers))
        .route("/add", post(routes::add_transfer))
        .route("/toggle/:id", get(routes::toggle_transfer))
        .route("/delete/:id", get(routes::delete_transfer))
        .route("/info", get(routes::dir_info))
        .route("/logout", get(routes::logout))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ))
        // Added after the auth layer so it stays reachable without a session
        .route("/login", post(routes::login));

    Router::new()
        .route("/ping", get(|| async { "pong" }))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
