//! Tag repository.

use std::{collections::BTreeSet, ops::Deref, sync::Arc};

use super::base::Dao;
use crate::{
    entities::{ImageTag, Tag, image_tag, tag},
    transaction::{begin, db_error, finish},
};
use artfeed_common::AppResult;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, JoinType,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use uuid::Uuid;

/// Tag repository for database operations.
#[derive(Clone)]
pub struct TagRepository {
    base: Dao<tag::ActiveModel>,
}

impl Deref for TagRepository {
    type Target = Dao<tag::ActiveModel>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl TagRepository {
    /// Create a new tag repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { base: Dao::new(db) }
    }

    /// Tags attached to an image, ordered by name.
    pub async fn find_by_image_id(&self, image_id: Uuid) -> AppResult<Vec<tag::Model>> {
        let txn = begin(self.connection()).await?;
        let result = Tag::find()
            .join(JoinType::InnerJoin, tag::Relation::ImageTags.def())
            .filter(image_tag::Column::ImageId.eq(image_id))
            .order_by_asc(tag::Column::Name)
            .all(&txn)
            .await
            .map_err(db_error);
        finish(txn, result).await
    }
}

/// Find or create each named tag and link it to `image_id`.
///
/// Duplicate names are collapsed and existing links are left alone.
pub(crate) async fn attach_tags<C: ConnectionTrait>(
    conn: &C,
    image_id: Uuid,
    names: &[String],
) -> AppResult<Vec<tag::Model>> {
    let names: BTreeSet<&str> = names.iter().map(String::as_str).collect();
    let mut tags = Vec::with_capacity(names.len());

    for name in names {
        let tag = find_or_create(conn, name).await?;

        let linked = ImageTag::find()
            .filter(image_tag::Column::ImageId.eq(image_id))
            .filter(image_tag::Column::TagId.eq(tag.id))
            .one(conn)
            .await
            .map_err(db_error)?;

        if linked.is_none() {
            image_tag::ActiveModel {
                image_id: Set(image_id),
                tag_id: Set(tag.id),
                ..Default::default()
            }
            .insert(conn)
            .await
            .map_err(db_error)?;
        }

        tags.push(tag);
    }

    Ok(tags)
}

async fn find_or_create<C: ConnectionTrait>(conn: &C, name: &str) -> AppResult<tag::Model> {
    let existing = Tag::find()
        .filter(tag::Column::Name.eq(name))
        .one(conn)
        .await
        .map_err(db_error)?;

    if let Some(tag) = existing {
        return Ok(tag);
    }

    tag::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(db_error)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn tag_model(name: &str) -> tag::Model {
        let now = Utc::now().into();
        tag::Model {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn link(image_id: Uuid, tag_id: Uuid) -> image_tag::Model {
        let now = Utc::now().into();
        image_tag::Model {
            id: Uuid::new_v4(),
            image_id,
            tag_id,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_attach_reuses_existing_tag_and_link() {
        let image_id = Uuid::new_v4();
        let cat = tag_model("#cat");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[cat.clone()]])
            .append_query_results([[link(image_id, cat.id)]])
            .into_connection();

        let tags = attach_tags(&db, image_id, &["#cat".to_string(), "#cat".to_string()])
            .await
            .unwrap();

        assert_eq!(tags, vec![cat]);
        // Two lookups, no inserts.
        assert_eq!(db.into_transaction_log().len(), 2);
    }

    #[tokio::test]
    async fn test_attach_creates_missing_tag() {
        let image_id = Uuid::new_v4();
        let art = tag_model("#art");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<tag::Model>::new()])
            .append_query_results([[art.clone()]])
            .append_query_results([Vec::<image_tag::Model>::new()])
            .append_query_results([[link(image_id, art.id)]])
            .into_connection();

        let tags = attach_tags(&db, image_id, &["#art".to_string()]).await.unwrap();

        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "#art");
        assert_eq!(db.into_transaction_log().len(), 4);
    }

    #[tokio::test]
    async fn test_find_by_image_id() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[tag_model("#art"), tag_model("#cat")]])
                .into_connection(),
        );

        let repo = TagRepository::new(db);
        let tags = repo.find_by_image_id(Uuid::new_v4()).await.unwrap();

        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].name, "#art");
    }
}
