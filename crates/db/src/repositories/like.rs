//! Like repository.

use std::{ops::Deref, sync::Arc};

use super::base::Dao;
use crate::entities::like;
use artfeed_common::AppResult;
use sea_orm::{ColumnTrait, Condition, DatabaseConnection};
use uuid::Uuid;

/// Like repository for database operations.
#[derive(Clone)]
pub struct LikeRepository {
    base: Dao<like::ActiveModel>,
}

impl Deref for LikeRepository {
    type Target = Dao<like::ActiveModel>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl LikeRepository {
    /// Create a new like repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { base: Dao::new(db) }
    }

    /// The like `user_id` placed on `image_id`, if any.
    pub async fn find_by_user_and_image(
        &self,
        user_id: Uuid,
        image_id: Uuid,
    ) -> AppResult<Option<like::Model>> {
        self.find_one_or_none(
            Condition::all()
                .add(like::Column::FromUserId.eq(user_id))
                .add(like::Column::ToImageId.eq(image_id)),
        )
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, RuntimeErr, Set};

    #[tokio::test]
    async fn test_find_by_user_and_image() {
        let now = Utc::now().into();
        let like = like::Model {
            id: Uuid::new_v4(),
            from_user_id: Uuid::new_v4(),
            to_image_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[like.clone()]])
                .into_connection(),
        );

        let repo = LikeRepository::new(db);
        let found = repo
            .find_by_user_and_image(like.from_user_id, like.to_image_id)
            .await
            .unwrap();

        assert_eq!(found, Some(like));
    }

    #[tokio::test]
    async fn test_add_surfaces_insert_failure() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_errors([DbErr::Query(RuntimeErr::Internal(
                    "insert failed".to_string(),
                ))])
                .into_connection(),
        );

        let repo = LikeRepository::new(db);
        let result = repo
            .add(like::ActiveModel {
                from_user_id: Set(Uuid::new_v4()),
                to_image_id: Set(Uuid::new_v4()),
                ..Default::default()
            })
            .await;

        assert!(result.is_err());
    }
}
