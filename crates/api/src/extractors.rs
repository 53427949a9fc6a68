//! Request extractors.

use artfeed_common::AppError;
use artfeed_core::TokenPair;
use artfeed_db::entities::user;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::CookieJar;

use crate::middleware::AppState;

/// Authenticated user extractor.
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by auth middleware
        parts
            .extensions
            .get::<user::Model>()
            .cloned()
            .map(AuthUser)
            .ok_or(AppError::Unauthorized)
    }
}

/// Optional authenticated user extractor.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<user::Model>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<user::Model>().cloned()))
    }
}

/// A user holding a valid refresh token, with a freshly issued token pair.
///
/// Every fault (missing cookie, bad signature, expiry, an access token in
/// the refresh slot, a deleted user) rejects as [`AppError::Unauthorized`].
#[derive(Debug, Clone)]
pub struct RefreshUser(pub user::Model, pub TokenPair);

impl FromRequestParts<AppState> for RefreshUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(&state.cookies.refresh_name)
            .map(|cookie| cookie.value().to_string())
            .ok_or(AppError::Unauthorized)?;

        let (user, tokens) = state.auth.refresh(&token).await.map_err(|e| {
            tracing::debug!(error = %e, "Rejected refresh token");
            AppError::Unauthorized
        })?;

        Ok(Self(user, tokens))
    }
}
