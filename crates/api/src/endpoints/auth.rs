//! Authentication endpoints.

use axum::{Json, Router, extract::State, routing::{delete, post}};
use axum_extra::extract::{CookieJar, WithRejection};
use artfeed_common::{AppError, AppResult};
use artfeed_core::{LoginInput, RegisterInput};
use serde::Serialize;

use crate::{
    endpoints::users::MeResponse,
    extractors::{AuthUser, RefreshUser},
    middleware::AppState,
    response::ApiResponse,
};

/// Plain acknowledgement.
#[derive(Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// Create a new account.
async fn register(
    State(state): State<AppState>,
    WithRejection(Json(input), _): WithRejection<Json<RegisterInput>, AppError>,
) -> AppResult<ApiResponse<MeResponse>> {
    let user = state.auth.register(input).await?;
    Ok(ApiResponse::ok(user.into()))
}

/// Log in and start a cookie session.
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(input), _): WithRejection<Json<LoginInput>, AppError>,
) -> AppResult<(CookieJar, ApiResponse<MeResponse>)> {
    let (user, tokens) = state.auth.login(input).await?;
    let jar = state.cookies.start(jar, tokens);

    Ok((jar, ApiResponse::ok(user.into())))
}

/// End the cookie session. Succeeds without one.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, ApiResponse<OkResponse>) {
    (state.cookies.end(jar), ApiResponse::ok(OkResponse { ok: true }))
}

/// Trade the refresh cookie for a new token pair.
async fn refresh(
    State(state): State<AppState>,
    RefreshUser(user, tokens): RefreshUser,
    jar: CookieJar,
) -> (CookieJar, ApiResponse<MeResponse>) {
    (state.cookies.start(jar, tokens), ApiResponse::ok(user.into()))
}

/// Delete the current account with everything it owns.
async fn delete_account(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    jar: CookieJar,
) -> AppResult<(CookieJar, ApiResponse<OkResponse>)> {
    state.auth.delete_account(user.id).await?;
    Ok((state.cookies.end(jar), ApiResponse::ok(OkResponse { ok: true })))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/refresh", post(refresh))
        .route("/auth/delete", delete(delete_account))
}
