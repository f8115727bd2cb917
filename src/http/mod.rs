use axum::extract::DefaultBodyLimit;
use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod routes;

pub use auth::AuthUser;
pub use error::AppError;

pub fn router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.upload_max_bytes);

    Router::new()
        .merge(routes::health())
        .merge(routes::auth())
        .merge(routes::images())
        .layer(body_limit)
        .with_state(state)
}
