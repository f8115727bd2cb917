use axum::{routing::get, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn auth() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
}

pub fn images() -> Router<AppState> {
    Router::new()
        .route("/upload", post(handlers::upload))
        .route("/gallery", get(handlers::gallery))
}
