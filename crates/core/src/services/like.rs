//! Like service.

use artfeed_common::{AppError, AppResult};
use artfeed_db::{
    entities::{like, user},
    repositories::{ImageRepository, LikeRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use uuid::Uuid;

use super::image::ImageService;

/// Input for placing a like.
#[derive(Debug, Deserialize)]
pub struct PlaceLikeInput {
    pub to_image_id: Uuid,
}

/// Like service for business logic.
#[derive(Clone)]
pub struct LikeService {
    like_repo: LikeRepository,
    image_repo: ImageRepository,
    images: ImageService,
}

impl LikeService {
    /// Create a new like service.
    #[must_use]
    pub const fn new(like_repo: LikeRepository, image_repo: ImageRepository, images: ImageService) -> Self {
        Self {
            like_repo,
            image_repo,
            images,
        }
    }

    /// Like an image. Returns the new like count.
    ///
    /// Images the user cannot see are reported as missing. Liking your
    /// own image or liking twice is a conflict.
    pub async fn place(&self, user: &user::Model, input: PlaceLikeInput) -> AppResult<u64> {
        let image = self.images.find_visible(input.to_image_id, Some(user)).await?;

        if image.author_id == user.id {
            return Err(AppError::Conflict("You cannot like your own image".to_string()));
        }
        if self
            .like_repo
            .find_by_user_and_image(user.id, image.id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("You have already liked this image".to_string()));
        }

        self.like_repo
            .add(like::ActiveModel {
                from_user_id: Set(user.id),
                to_image_id: Set(image.id),
                ..Default::default()
            })
            .await?;

        tracing::info!(user_id = %user.id, image_id = %image.id, "Placed like");
        self.image_repo.likes_count(image.id).await
    }

    /// Resolve a like by id.
    pub async fn find(&self, like_id: Uuid) -> AppResult<like::Model> {
        self.like_repo
            .find_one_or_none_by_id(like_id)
            .await?
            .ok_or_else(|| AppError::NotFound("This like does not exist".to_string()))
    }

    /// Remove a like placed by `user`. Returns the image's new like count.
    pub async fn remove(&self, like: &like::Model, user: &user::Model) -> AppResult<u64> {
        if like.from_user_id != user.id {
            return Err(AppError::Forbidden("You can only remove your own likes".to_string()));
        }

        if !self.like_repo.delete_one_by_id(like.id).await? {
            return Err(AppError::NotFound("This like does not exist".to_string()));
        }

        tracing::info!(user_id = %user.id, image_id = %like.to_image_id, "Removed like");
        self.image_repo.likes_count(like.to_image_id).await
    }
}
