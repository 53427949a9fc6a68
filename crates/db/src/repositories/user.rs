//! User repository.

use std::{ops::Deref, sync::Arc};

use super::base::Dao;
use crate::{
    entities::{User, user},
    transaction::{begin, db_error, finish},
};
use artfeed_common::AppResult;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    sea_query::Expr,
};
use uuid::Uuid;

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    base: Dao<user::ActiveModel>,
}

impl Deref for UserRepository {
    type Target = Dao<user::ActiveModel>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { base: Dao::new(db) }
    }

    /// Find a user by exact username.
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<user::Model>> {
        self.find_one_or_none(Condition::all().add(user::Column::Username.eq(username)))
            .await
    }

    /// Find a user by exact email.
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<user::Model>> {
        self.find_one_or_none(Condition::all().add(user::Column::Email.eq(email)))
            .await
    }

    /// Decrement the user's remaining generations by one.
    ///
    /// Does not check that the counter is positive. Returns the new value,
    /// or `None` if the user does not exist.
    pub async fn decrease_generations_by_id(&self, user_id: Uuid) -> AppResult<Option<i32>> {
        let txn = begin(self.connection()).await?;
        let result = decrease_generations(&txn, user_id).await;
        finish(txn, result).await
    }

    /// Reset every user's counter to `allotment` in one statement.
    ///
    /// Returns the number of users touched.
    pub async fn update_daily_generations(&self, allotment: i32) -> AppResult<u64> {
        let txn = begin(self.connection()).await?;
        let result = User::update_many()
            .col_expr(user::Column::GenerationsLeft, Expr::value(allotment))
            .col_expr(user::Column::UpdatedAt, Expr::current_timestamp().into())
            .exec(&txn)
            .await
            .map(|res| res.rows_affected)
            .map_err(db_error);
        finish(txn, result).await
    }
}

async fn decrease_generations<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<Option<i32>> {
    let updated = User::update_many()
        .col_expr(
            user::Column::GenerationsLeft,
            Expr::col(user::Column::GenerationsLeft).sub(1),
        )
        .col_expr(user::Column::UpdatedAt, Expr::current_timestamp().into())
        .filter(user::Column::Id.eq(user_id))
        .exec(conn)
        .await
        .map_err(db_error)?;

    if updated.rows_affected == 0 {
        return Ok(None);
    }

    let user = User::find_by_id(user_id).one(conn).await.map_err(db_error)?;
    Ok(user.map(|u| u.generations_left))
}

/// Take one generation from `user_id` only if any are left.
///
/// Returns `false` when the counter was already at zero or the user is gone.
pub(crate) async fn take_generation<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<bool> {
    let updated = User::update_many()
        .col_expr(
            user::Column::GenerationsLeft,
            Expr::col(user::Column::GenerationsLeft).sub(1),
        )
        .col_expr(user::Column::UpdatedAt, Expr::current_timestamp().into())
        .filter(user::Column::Id.eq(user_id))
        .filter(user::Column::GenerationsLeft.gt(0))
        .exec(conn)
        .await
        .map_err(db_error)?;

    Ok(updated.rows_affected > 0)
}
