//! API middleware.

#![allow(missing_docs)]

use artfeed_core::{AuthService, ImageService, LikeService, UserService};
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use crate::session::CookieSettings;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub users: UserService,
    pub images: ImageService,
    pub likes: LikeService,
    pub cookies: CookieSettings,
}

/// Authentication middleware.
///
/// Resolves the access-token cookie to a user and stores it in the request
/// extensions. Any fault leaves the request anonymous; handlers that need a
/// user reject through [`crate::extractors::AuthUser`].
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let jar = CookieJar::from_headers(req.headers());

    if let Some(cookie) = jar.get(&state.cookies.access_name) {
        match state.auth.resolve_access_token(cookie.value()).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) => tracing::debug!(error = %e, "Ignoring access token"),
        }
    }

    next.run(req).await
}
