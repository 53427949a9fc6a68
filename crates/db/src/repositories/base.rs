//! Generic data access over any UUID-keyed entity.

use std::{marker::PhantomData, sync::Arc};

use crate::transaction::{begin, db_error, finish};
use artfeed_common::AppResult;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, DbErr, EntityTrait, IntoActiveModel, Iterable, PrimaryKeyToColumn,
    QueryFilter,
};
use uuid::Uuid;

/// Model type behind an active model.
pub type ModelOf<A> = <<A as ActiveModelTrait>::Entity as EntityTrait>::Model;

/// CRUD primitives shared by every repository.
///
/// Each method opens its own transaction and commits it before returning,
/// so callers never observe a partial write.
pub struct Dao<A> {
    db: Arc<DatabaseConnection>,
    _active_model: PhantomData<fn() -> A>,
}

impl<A> Clone for Dao<A> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            _active_model: PhantomData,
        }
    }
}

impl<A> Dao<A>
where
    A: ActiveModelTrait + ActiveModelBehavior + Send,
    ModelOf<A>: IntoActiveModel<A>,
{
    /// Create a new DAO on the given pool.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            _active_model: PhantomData,
        }
    }

    /// The underlying connection pool.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    /// Condition matching the row whose primary key is `id`.
    #[must_use]
    pub fn id_condition(id: Uuid) -> Condition {
        <A::Entity as EntityTrait>::PrimaryKey::iter()
            .fold(Condition::all(), |cond, key| cond.add(key.into_column().eq(id)))
    }

    /// Find by primary key.
    pub async fn find_one_or_none_by_id(&self, id: Uuid) -> AppResult<Option<ModelOf<A>>> {
        self.find_one_or_none(Self::id_condition(id)).await
    }

    /// Find the first row matching every predicate in `filter`.
    pub async fn find_one_or_none(&self, filter: Condition) -> AppResult<Option<ModelOf<A>>> {
        let txn = begin(&self.db).await?;
        let result = A::Entity::find()
            .filter(filter)
            .one(&txn)
            .await
            .map_err(db_error);
        finish(txn, result).await
    }

    /// Find all rows matching every predicate in `filter`.
    pub async fn find_all(&self, filter: Condition) -> AppResult<Vec<ModelOf<A>>> {
        let txn = begin(&self.db).await?;
        let result = A::Entity::find()
            .filter(filter)
            .all(&txn)
            .await
            .map_err(db_error);
        finish(txn, result).await
    }

    /// Insert a new row. Identity and timestamps come from the entity's
    /// `before_save` hook.
    pub async fn add(&self, model: A) -> AppResult<ModelOf<A>> {
        let txn = begin(&self.db).await?;
        let result = model.insert(&txn).await.map_err(db_error);
        finish(txn, result).await
    }

    /// Apply the set fields of `changes` to the row with primary key `id`.
    ///
    /// Returns `None` when no such row exists.
    pub async fn update_one_by_id(&self, id: Uuid, changes: A) -> AppResult<Option<ModelOf<A>>> {
        let txn = begin(&self.db).await?;
        let result = update_by_id(&txn, id, changes).await;
        finish(txn, result).await
    }

    /// Delete the row with primary key `id`. Dependents go with it through
    /// the cascading foreign keys.
    ///
    /// Returns `false` when no such row exists.
    pub async fn delete_one_by_id(&self, id: Uuid) -> AppResult<bool> {
        let txn = begin(&self.db).await?;
        let result = A::Entity::delete_many()
            .filter(Self::id_condition(id))
            .exec(&txn)
            .await
            .map(|res| res.rows_affected > 0)
            .map_err(db_error);
        finish(txn, result).await
    }
}

async fn update_by_id<A, C>(conn: &C, id: Uuid, mut changes: A) -> AppResult<Option<ModelOf<A>>>
where
    A: ActiveModelTrait + ActiveModelBehavior + Send,
    ModelOf<A>: IntoActiveModel<A>,
    C: ConnectionTrait,
{
    for key in <A::Entity as EntityTrait>::PrimaryKey::iter() {
        changes.set(key.into_column(), id.into());
    }

    match changes.update(conn).await {
        Ok(model) => Ok(Some(model)),
        Err(DbErr::RecordNotUpdated) => Ok(None),
        Err(e) => Err(db_error(e)),
    }
}
