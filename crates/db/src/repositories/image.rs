//! Image repository: feed search, visibility and generated-image inserts.

use std::{ops::Deref, sync::Arc};

use super::{base::Dao, tag::attach_tags, user::take_generation};
use crate::{
    entities::{Image, Like, image, image_tag, like, tag},
    transaction::{begin, db_error, finish},
};
use artfeed_common::AppResult;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, JoinType, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Set,
    prelude::DateTimeWithTimeZone,
    sea_query::{Expr, LikeExpr, SimpleExpr},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shortest search term that is not ignored.
pub const MIN_TERM_LEN: usize = 3;
/// Longest search term that is not ignored.
pub const MAX_TERM_LEN: usize = 300;
/// Leading marker that turns a term into an exact tag lookup.
pub const TAG_MARKER: char = '#';

/// Feed sort key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    /// Creation time.
    Date,
    /// Number of likes.
    #[default]
    Likes,
}

/// Feed sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderBy {
    /// Ascending.
    Asc,
    /// Descending.
    #[default]
    Desc,
}

impl From<OrderBy> for Order {
    fn from(order: OrderBy) -> Self {
        match order {
            OrderBy::Asc => Self::Asc,
            OrderBy::Desc => Self::Desc,
        }
    }
}

/// Parameters of a feed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSearch {
    pub sort_by: SortBy,
    pub order_by: OrderBy,
    pub term: Option<String>,
    /// One-based page number.
    pub page: u64,
    pub page_size: u64,
}

impl Default for ImageSearch {
    fn default() -> Self {
        Self {
            sort_by: SortBy::default(),
            order_by: OrderBy::default(),
            term: None,
            page: 1,
            page_size: 9,
        }
    }
}

/// How a search term narrows the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTerm {
    /// Exact tag name, marker included.
    Tag(String),
    /// Substring of the prompt.
    Prompt(String),
}

impl SearchTerm {
    /// Classify a raw term. Terms outside the accepted length after
    /// trimming are treated as absent.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        let term = raw?.trim();
        let len = term.chars().count();
        if !(MIN_TERM_LEN..=MAX_TERM_LEN).contains(&len) {
            return None;
        }

        if term.starts_with(TAG_MARKER) {
            Some(Self::Tag(term.to_string()))
        } else {
            Some(Self::Prompt(term.to_string()))
        }
    }
}

/// An image row with its like count.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct ImageWithLikes {
    pub id: Uuid,
    pub url: String,
    pub prompt: String,
    pub is_public: bool,
    pub author_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub likes_count: i64,
}

/// One page of feed results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImagePage {
    pub images: Vec<ImageWithLikes>,
    pub total_pages: u64,
    pub total_results: u64,
}

/// Image repository for database operations.
#[derive(Clone)]
pub struct ImageRepository {
    base: Dao<image::ActiveModel>,
}

impl Deref for ImageRepository {
    type Target = Dao<image::ActiveModel>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl ImageRepository {
    /// Create a new image repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { base: Dao::new(db) }
    }

    /// Search, sort and paginate images matching `filter`.
    ///
    /// A page past the last one is empty rather than an error.
    pub async fn find_all_with_filters(
        &self,
        search: &ImageSearch,
        filter: Condition,
    ) -> AppResult<ImagePage> {
        let txn = begin(self.connection()).await?;
        let result = search_images(&txn, search, filter).await;
        finish(txn, result).await
    }

    /// Link tags to an image, creating the missing ones.
    ///
    /// Returns `None` if the image does not exist.
    pub async fn create_tags_for_image_by_id(
        &self,
        image_id: Uuid,
        names: &[String],
    ) -> AppResult<Option<Vec<tag::Model>>> {
        let txn = begin(self.connection()).await?;
        let result: AppResult<Option<Vec<tag::Model>>> = async {
            let exists = Image::find_by_id(image_id)
                .one(&txn)
                .await
                .map_err(db_error)?
                .is_some();
            if !exists {
                return Ok(None);
            }
            attach_tags(&txn, image_id, names).await.map(Some)
        }
        .await;
        finish(txn, result).await
    }

    /// Flip the public flag. Returns the new value, or `None` if the image
    /// does not exist.
    pub async fn change_visibility_by_id(&self, image_id: Uuid) -> AppResult<Option<bool>> {
        let txn = begin(self.connection()).await?;
        let result = toggle_visibility(&txn, image_id).await;
        finish(txn, result).await
    }

    /// Take one generation from the author and store the new private image
    /// with its tags, all in one transaction.
    ///
    /// Returns `None` and writes nothing when the author has no generations
    /// left.
    pub async fn create_generated_image(
        &self,
        author_id: Uuid,
        url: String,
        prompt: String,
        tags: &[String],
    ) -> AppResult<Option<image::Model>> {
        let txn = begin(self.connection()).await?;
        let result: AppResult<Option<image::Model>> = async {
            if !take_generation(&txn, author_id).await? {
                return Ok(None);
            }

            let image = image::ActiveModel {
                url: Set(url),
                prompt: Set(prompt),
                is_public: Set(false),
                author_id: Set(author_id),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(db_error)?;

            attach_tags(&txn, image.id, tags).await?;
            Ok(Some(image))
        }
        .await;
        finish(txn, result).await
    }

    /// Number of likes on an image.
    pub async fn likes_count(&self, image_id: Uuid) -> AppResult<u64> {
        let txn = begin(self.connection()).await?;
        let result = Like::find()
            .filter(like::Column::ToImageId.eq(image_id))
            .count(&txn)
            .await
            .map_err(db_error);
        finish(txn, result).await
    }
}

fn likes_count_expr() -> SimpleExpr {
    Expr::col((Like, like::Column::Id)).count()
}

async fn search_images<C: ConnectionTrait>(
    conn: &C,
    search: &ImageSearch,
    filter: Condition,
) -> AppResult<ImagePage> {
    let mut query = Image::find()
        .column_as(likes_count_expr(), "likes_count")
        .join(JoinType::LeftJoin, image::Relation::Likes.def())
        .filter(filter);

    match SearchTerm::parse(search.term.as_deref()) {
        Some(SearchTerm::Tag(name)) => {
            query = query
                .join(JoinType::InnerJoin, image::Relation::ImageTags.def())
                .join(JoinType::InnerJoin, image_tag::Relation::Tag.def())
                .filter(tag::Column::Name.eq(name));
        }
        Some(SearchTerm::Prompt(text)) => {
            query = query.filter(image::Column::Prompt.like(contains_pattern(&text)));
        }
        None => {}
    }

    // Collapses the duplicate rows produced by the joins.
    query = query.group_by(image::Column::Id);

    let order: Order = search.order_by.into();
    query = match search.sort_by {
        SortBy::Date => query.order_by(image::Column::CreatedAt, order),
        SortBy::Likes => query.order_by(likes_count_expr(), order),
    };
    query = query.order_by_asc(image::Column::Id);

    let page_size = search.page_size.max(1);
    let paginator = query.into_model::<ImageWithLikes>().paginate(conn, page_size);

    let totals = paginator.num_items_and_pages().await.map_err(db_error)?;
    let page_index = search.page.saturating_sub(1);

    // Pages past the end are empty; the offset is never computed for them.
    let images = if page_index >= totals.number_of_pages
        || page_index.checked_mul(page_size).is_none()
    {
        Vec::new()
    } else {
        paginator.fetch_page(page_index).await.map_err(db_error)?
    };

    Ok(ImagePage {
        images,
        total_pages: totals.number_of_pages,
        total_results: totals.number_of_items,
    })
}

/// `LIKE` pattern matching `text` anywhere, with wildcards in `text` escaped.
fn contains_pattern(text: &str) -> LikeExpr {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    LikeExpr::new(format!("%{escaped}%")).escape('\\')
}

async fn toggle_visibility<C: ConnectionTrait>(conn: &C, image_id: Uuid) -> AppResult<Option<bool>> {
    let updated = Image::update_many()
        .col_expr(image::Column::IsPublic, Expr::col(image::Column::IsPublic).not())
        .col_expr(image::Column::UpdatedAt, Expr::current_timestamp().into())
        .filter(image::Column::Id.eq(image_id))
        .exec(conn)
        .await
        .map_err(db_error)?;

    if updated.rows_affected == 0 {
        return Ok(None);
    }

    let image = Image::find_by_id(image_id).one(conn).await.map_err(db_error)?;
    Ok(image.map(|i| i.is_public))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};
    use std::collections::BTreeMap;

    fn image_model(author_id: Uuid, is_public: bool) -> image::Model {
        let now = Utc::now().into();
        image::Model {
            id: Uuid::new_v4(),
            url: "https://i.ibb.co/abc/image.jpeg".to_string(),
            prompt: "a cat painting".to_string(),
            is_public,
            author_id,
            created_at: now,
            updated_at: now,
        }
    }

    fn row(likes: i64) -> BTreeMap<&'static str, Value> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        maplit::btreemap! {
            "id" => Value::from(Uuid::new_v4()),
            "url" => Value::from("https://i.ibb.co/abc/image.jpeg"),
            "prompt" => Value::from("a cat painting"),
            "is_public" => Value::from(true),
            "author_id" => Value::from(Uuid::new_v4()),
            "created_at" => Value::from(now),
            "updated_at" => Value::from(now),
            "likes_count" => Value::from(likes),
        }
    }

    fn count_row(n: i64) -> BTreeMap<&'static str, Value> {
        maplit::btreemap! { "num_items" => Value::BigInt(Some(n)) }
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn logged_sql(db: Arc<DatabaseConnection>) -> String {
        let Ok(db) = Arc::try_unwrap(db) else {
            panic!("connection still shared");
        };
        format!("{:?}", db.into_transaction_log())
    }

    #[test]
    fn test_term_classification() {
        assert_eq!(
            SearchTerm::parse(Some("  #cat ")),
            Some(SearchTerm::Tag("#cat".to_string()))
        );
        assert_eq!(
            SearchTerm::parse(Some("sunset")),
            Some(SearchTerm::Prompt("sunset".to_string()))
        );
        assert_eq!(SearchTerm::parse(Some("ab")), None);
        assert_eq!(SearchTerm::parse(Some("   ")), None);
        assert_eq!(SearchTerm::parse(Some(&"x".repeat(301))), None);
        assert!(SearchTerm::parse(Some(&"x".repeat(300))).is_some());
        assert_eq!(SearchTerm::parse(None), None);
    }

    #[test]
    fn test_defaults() {
        let search = ImageSearch::default();
        assert_eq!(search.sort_by, SortBy::Likes);
        assert_eq!(search.order_by, OrderBy::Desc);
        assert_eq!(search.page, 1);
        assert_eq!(search.page_size, 9);
    }

    #[tokio::test]
    async fn test_find_all_with_filters_pages() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(10)]])
                .append_query_results([[row(3), row(1), row(0)]])
                .into_connection(),
        );

        let repo = ImageRepository::new(db.clone());
        let search = ImageSearch {
            page_size: 3,
            ..ImageSearch::default()
        };
        let page = repo
            .find_all_with_filters(&search, Condition::all().add(image::Column::IsPublic.eq(true)))
            .await
            .unwrap();

        assert_eq!(page.total_results, 10);
        assert_eq!(page.total_pages, 4);
        assert_eq!(page.images.len(), 3);
        assert_eq!(page.images[0].likes_count, 3);

        drop(repo);
        let sql = logged_sql(db);
        assert!(sql.contains("LEFT JOIN"));
        assert!(sql.contains("GROUP BY"));
        assert!(sql.contains("COUNT"));
    }

    #[tokio::test]
    async fn test_find_all_with_filters_by_tag_joins_tags() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(1)]])
                .append_query_results([[row(0)]])
                .into_connection(),
        );

        let repo = ImageRepository::new(db.clone());
        let search = ImageSearch {
            term: Some("#cat".to_string()),
            sort_by: SortBy::Date,
            ..ImageSearch::default()
        };
        let page = repo
            .find_all_with_filters(&search, Condition::all())
            .await
            .unwrap();
        assert_eq!(page.images.len(), 1);

        drop(repo);
        let sql = logged_sql(db);
        assert!(sql.contains("INNER JOIN \\\"tags\\\""));
        assert!(sql.contains("#cat"));
    }

    #[tokio::test]
    async fn test_find_all_with_filters_by_prompt_escapes_wildcards() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(0)]])
                .into_connection(),
        );

        let repo = ImageRepository::new(db.clone());
        let search = ImageSearch {
            term: Some("100%".to_string()),
            ..ImageSearch::default()
        };
        let page = repo
            .find_all_with_filters(&search, Condition::all())
            .await
            .unwrap();
        assert!(page.images.is_empty());
        assert_eq!(page.total_pages, 0);

        drop(repo);
        let sql = logged_sql(db);
        assert!(sql.contains("LIKE"));
        assert!(!sql.contains("\\\"tags\\\""));
    }

    #[tokio::test]
    async fn test_find_all_with_filters_page_past_end_is_empty() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(10)]])
                .append_query_results([[count_row(10)]])
                .into_connection(),
        );

        let repo = ImageRepository::new(db.clone());
        for page in [5, u64::MAX / 2] {
            let search = ImageSearch {
                page,
                page_size: 3,
                ..ImageSearch::default()
            };
            let result = repo
                .find_all_with_filters(&search, Condition::all())
                .await
                .unwrap();

            assert!(result.images.is_empty());
            assert_eq!(result.total_results, 10);
            assert_eq!(result.total_pages, 4);
        }

        drop(repo);
        let sql = logged_sql(db);
        assert!(!sql.contains("OFFSET"));
    }

    #[test]
    fn test_contains_pattern_escapes() {
        let rendered = format!("{:?}", contains_pattern("50%_off"));
        assert!(rendered.contains("%50\\\\%\\\\_off%"));
    }

    #[tokio::test]
    async fn test_change_visibility_returns_new_flag() {
        let image = image_model(Uuid::new_v4(), true);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1)])
                .append_query_results([[image.clone()]])
                .into_connection(),
        );

        let repo = ImageRepository::new(db);
        let flag = repo.change_visibility_by_id(image.id).await.unwrap();

        assert_eq!(flag, Some(true));
    }

    #[tokio::test]
    async fn test_change_visibility_missing_image() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(0)])
                .into_connection(),
        );

        let repo = ImageRepository::new(db);
        assert!(repo.change_visibility_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_change_visibility_touches_updated_at() {
        let image = image_model(Uuid::new_v4(), false);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1)])
                .append_query_results([[image.clone()]])
                .into_connection(),
        );

        let repo = ImageRepository::new(db.clone());
        assert_eq!(repo.change_visibility_by_id(image.id).await.unwrap(), Some(false));
        drop(repo);

        let log = logged_sql(db);
        assert!(log.contains("NOT"));
        assert!(log.contains("updated_at"));
        assert!(log.contains("CURRENT_TIMESTAMP"));
    }

    #[tokio::test]
    async fn test_create_tags_for_missing_image_is_none() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<image::Model>::new()])
                .into_connection(),
        );

        let repo = ImageRepository::new(db);
        let tags = repo
            .create_tags_for_image_by_id(Uuid::new_v4(), &["#cat".to_string()])
            .await
            .unwrap();

        assert!(tags.is_none());
    }

    #[tokio::test]
    async fn test_create_generated_image_without_quota_writes_nothing() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(0)])
                .into_connection(),
        );

        let repo = ImageRepository::new(db.clone());
        let created = repo
            .create_generated_image(
                Uuid::new_v4(),
                "https://i.ibb.co/abc/image.jpeg".to_string(),
                "a cat".to_string(),
                &[],
            )
            .await
            .unwrap();
        assert!(created.is_none());

        drop(repo);
        let sql = logged_sql(db);
        assert!(!sql.contains("INSERT"));
    }

    #[tokio::test]
    async fn test_create_generated_image_inserts_private_image() {
        let author_id = Uuid::new_v4();
        let image = image_model(author_id, false);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1)])
                .append_query_results([[image.clone()]])
                .into_connection(),
        );

        let repo = ImageRepository::new(db);
        let created = repo
            .create_generated_image(author_id, image.url.clone(), image.prompt.clone(), &[])
            .await
            .unwrap()
            .unwrap();

        assert_eq!(created.author_id, author_id);
        assert!(!created.is_public);
    }

    #[tokio::test]
    async fn test_likes_count() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(2)]])
                .into_connection(),
        );

        let repo = ImageRepository::new(db);
        assert_eq!(repo.likes_count(Uuid::new_v4()).await.unwrap(), 2);
    }
}
