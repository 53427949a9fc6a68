//! Image endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, patch, post},
};
use artfeed_common::{AppError, AppResult};
use axum_extra::extract::WithRejection;
use artfeed_core::{CreateImageInput, ImageDetails};
use artfeed_db::repositories::{ImagePage, ImageSearch, OrderBy, SortBy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::ApiResponse,
};

/// Where the new image can be viewed.
#[derive(Serialize)]
pub struct CreateImageResponse {
    pub image_url: String,
}

/// Generate an image for the current user. It starts out private.
async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(Json(input), _): WithRejection<Json<CreateImageInput>, AppError>,
) -> AppResult<ApiResponse<CreateImageResponse>> {
    let image = state.images.create(&user, input).await?;

    Ok(ApiResponse::ok(CreateImageResponse {
        image_url: format!("/images/{}", image.id),
    }))
}

/// Feed query string.
#[derive(Debug, Deserialize, Validate)]
pub struct ListImagesQuery {
    #[serde(default)]
    pub sort_by: SortBy,
    #[serde(default)]
    pub order_by: OrderBy,
    pub term: Option<String>,
    #[serde(default = "default_page")]
    #[validate(range(min = 1, message = "Page must be at least 1"))]
    pub page: u64,
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 100, message = "Page size must be between 1 and 100"))]
    pub page_size: u64,
    /// Restrict the feed to one author.
    pub author_id: Option<Uuid>,
}

const fn default_page() -> u64 {
    1
}

const fn default_page_size() -> u64 {
    9
}

/// List images with sorting, search and pagination.
async fn list(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    WithRejection(Query(query), _): WithRejection<Query<ListImagesQuery>, AppError>,
) -> AppResult<ApiResponse<ImagePage>> {
    query.validate()?;

    let search = ImageSearch {
        sort_by: query.sort_by,
        order_by: query.order_by,
        term: query.term,
        page: query.page,
        page_size: query.page_size,
    };
    let page = state
        .images
        .list(viewer.as_ref(), query.author_id, &search)
        .await?;

    Ok(ApiResponse::ok(page))
}

/// Show one image with its tags, like count and the viewer's like.
async fn show(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    WithRejection(Path(image_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<ApiResponse<ImageDetails>> {
    let image = state.images.find_visible(image_id, viewer.as_ref()).await?;
    let details = state.images.details(image, viewer.as_ref()).await?;

    Ok(ApiResponse::ok(details))
}

/// Plain acknowledgement.
#[derive(Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

/// Delete one of the current user's images.
async fn remove(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(Path(image_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<ApiResponse<DeletedResponse>> {
    let image = state.images.find_visible(image_id, Some(&user)).await?;
    state.images.delete(&image, &user).await?;

    Ok(ApiResponse::ok(DeletedResponse { deleted: true }))
}

/// New visibility of an image.
#[derive(Serialize)]
pub struct VisibilityResponse {
    pub is_public: bool,
}

/// Flip one of the current user's images between public and private.
async fn toggle_visibility(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(Path(image_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<ApiResponse<VisibilityResponse>> {
    let image = state.images.find_visible(image_id, Some(&user)).await?;
    let is_public = state.images.toggle_visibility(&image, &user).await?;

    Ok(ApiResponse::ok(VisibilityResponse { is_public }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/images", get(list))
        .route("/images/create", post(create))
        .route("/images/{id}", get(show))
        .route("/images/delete/{id}", delete(remove))
        .route("/images/visibility/{id}", patch(toggle_visibility))
}
