//! API endpoints.

mod auth;
mod images;
mod likes;
mod users;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(images::router())
        .merge(likes::router())
        .merge(users::router())
}
