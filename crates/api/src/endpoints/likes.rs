//! Like endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, post},
};
use artfeed_common::{AppError, AppResult};
use axum_extra::extract::WithRejection;
use artfeed_core::PlaceLikeInput;
use serde::Serialize;
use uuid::Uuid;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Like count after the change.
#[derive(Serialize)]
pub struct LikesCountResponse {
    pub likes_count: u64,
}

async fn place(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(Json(input), _): WithRejection<Json<PlaceLikeInput>, AppError>,
) -> AppResult<ApiResponse<LikesCountResponse>> {
    let likes_count = state.likes.place(&user, input).await?;
    Ok(ApiResponse::ok(LikesCountResponse { likes_count }))
}

async fn remove(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(Path(like_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<ApiResponse<LikesCountResponse>> {
    let like = state.likes.find(like_id).await?;
    let likes_count = state.likes.remove(&like, &user).await?;

    Ok(ApiResponse::ok(LikesCountResponse { likes_count }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/likes/place", post(place))
        .route("/likes/delete/{id}", delete(remove))
}
