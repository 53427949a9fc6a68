//! Image service: generation flow, feed, visibility.

use std::sync::Arc;

use artfeed_common::{AppError, AppResult};
use artfeed_db::{
    entities::{image, like, user},
    repositories::{ImagePage, ImageRepository, ImageSearch, LikeRepository, TagRepository},
};
use sea_orm::{ColumnTrait, Condition};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::generation::{ImageHost, ImageModel, normalize_tag};

const IMAGE_NOT_FOUND: &str = "This image does not exist or is private.";

/// Input for generating an image.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateImageInput {
    #[validate(length(min = 3, max = 200, message = "Prompt must be between 3 and 200 characters long"))]
    pub prompt: String,
}

/// An image with its tags, like count and the viewer's like.
#[derive(Debug, Clone, Serialize)]
pub struct ImageDetails {
    #[serde(flatten)]
    pub image: image::Model,
    pub tags: Vec<String>,
    pub likes_count: u64,
    /// `None` for anonymous viewers and viewers who have not liked it.
    pub like: Option<like::Model>,
}

/// Image service for business logic.
#[derive(Clone)]
pub struct ImageService {
    image_repo: ImageRepository,
    tag_repo: TagRepository,
    like_repo: LikeRepository,
    model: Arc<dyn ImageModel>,
    host: Arc<dyn ImageHost>,
}

impl ImageService {
    /// Create a new image service.
    #[must_use]
    pub fn new(
        image_repo: ImageRepository,
        tag_repo: TagRepository,
        like_repo: LikeRepository,
        model: Arc<dyn ImageModel>,
        host: Arc<dyn ImageHost>,
    ) -> Self {
        Self {
            image_repo,
            tag_repo,
            like_repo,
            model,
            host,
        }
    }

    /// Generate, tag, upload and store a new private image.
    ///
    /// Upstream faults are logged and reported as
    /// [`AppError::GenerationFailed`]. The quota is charged in the same
    /// transaction that stores the image.
    pub async fn create(&self, author: &user::Model, input: CreateImageInput) -> AppResult<image::Model> {
        input.validate()?;

        if author.generations_left <= 0 {
            return Err(AppError::QuotaExhausted);
        }

        let (url, tags) = self.generate(&input.prompt).await.map_err(|e| {
            tracing::error!(error = %e, user_id = %author.id, "Image generation failed");
            AppError::GenerationFailed
        })?;

        let image = self
            .image_repo
            .create_generated_image(author.id, url, input.prompt, &tags)
            .await?
            .ok_or(AppError::QuotaExhausted)?;

        tracing::info!(image_id = %image.id, user_id = %author.id, tags = tags.len(), "Created image");
        Ok(image)
    }

    async fn generate(&self, prompt: &str) -> AppResult<(String, Vec<String>)> {
        let data = self.model.generate_image(prompt).await?;
        let tags = self
            .model
            .generate_tags(&data)
            .await?
            .iter()
            .map(String::as_str)
            .map(normalize_tag)
            .filter(|tag| !tag.is_empty())
            .collect();
        let url = self.host.upload(&data).await?;
        Ok((url, tags))
    }

    /// Feed page.
    ///
    /// Only public images are listed, except that authors filtering by
    /// themselves also see their private ones.
    pub async fn list(
        &self,
        viewer: Option<&user::Model>,
        author_id: Option<Uuid>,
        search: &ImageSearch,
    ) -> AppResult<ImagePage> {
        let filter = match author_id {
            Some(author_id) if viewer.is_some_and(|v| v.id == author_id) => {
                Condition::all().add(image::Column::AuthorId.eq(author_id))
            }
            Some(author_id) => Condition::all()
                .add(image::Column::AuthorId.eq(author_id))
                .add(image::Column::IsPublic.eq(true)),
            None => Condition::all().add(image::Column::IsPublic.eq(true)),
        };

        self.image_repo.find_all_with_filters(search, filter).await
    }

    /// Resolve an image the viewer is allowed to see.
    ///
    /// Private images look missing to everyone but their author.
    pub async fn find_visible(&self, image_id: Uuid, viewer: Option<&user::Model>) -> AppResult<image::Model> {
        let image = self
            .image_repo
            .find_one_or_none_by_id(image_id)
            .await?
            .ok_or_else(|| AppError::NotFound(IMAGE_NOT_FOUND.to_string()))?;

        if !image.is_public && viewer.is_none_or(|v| v.id != image.author_id) {
            return Err(AppError::NotFound(IMAGE_NOT_FOUND.to_string()));
        }

        Ok(image)
    }

    /// Tags, like count and the viewer's like for a resolved image.
    pub async fn details(&self, image: image::Model, viewer: Option<&user::Model>) -> AppResult<ImageDetails> {
        let tags = self
            .tag_repo
            .find_by_image_id(image.id)
            .await?
            .into_iter()
            .map(|tag| tag.name)
            .collect();
        let likes_count = self.image_repo.likes_count(image.id).await?;
        let like = match viewer {
            Some(viewer) => self.like_repo.find_by_user_and_image(viewer.id, image.id).await?,
            None => None,
        };

        Ok(ImageDetails {
            image,
            tags,
            likes_count,
            like,
        })
    }

    /// Delete an image owned by `user`.
    pub async fn delete(&self, image: &image::Model, user: &user::Model) -> AppResult<()> {
        if image.author_id != user.id {
            return Err(AppError::Forbidden("You can only delete your own images".to_string()));
        }

        if !self.image_repo.delete_one_by_id(image.id).await? {
            return Err(AppError::NotFound(IMAGE_NOT_FOUND.to_string()));
        }

        tracing::info!(image_id = %image.id, user_id = %user.id, "Deleted image");
        Ok(())
    }

    /// Flip the visibility of an image owned by `user`. Returns the new
    /// public flag.
    pub async fn toggle_visibility(&self, image: &image::Model, user: &user::Model) -> AppResult<bool> {
        if image.author_id != user.id {
            return Err(AppError::Forbidden("Failed to change image visibility".to_string()));
        }

        let is_public = self
            .image_repo
            .change_visibility_by_id(image.id)
            .await?
            .ok_or_else(|| AppError::NotFound(IMAGE_NOT_FOUND.to_string()))?;

        tracing::info!(image_id = %image.id, is_public, "Changed image visibility");
        Ok(is_public)
    }
}
