//! Unit-of-work helpers.
//!
//! A repository operation calls [`begin`], runs its body against the
//! returned handle and hands the outcome to [`finish`], which commits on
//! `Ok` and rolls back on `Err`. The body's error is returned unchanged.

use artfeed_common::{AppError, AppResult};
use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, SqlErr, TransactionTrait};

/// Open a transaction on the pool.
pub async fn begin(db: &DatabaseConnection) -> AppResult<DatabaseTransaction> {
    db.begin().await.map_err(db_error)
}

/// Commit or roll back `txn` depending on `result`.
pub async fn finish<T>(txn: DatabaseTransaction, result: AppResult<T>) -> AppResult<T> {
    match result {
        Ok(value) => {
            txn.commit().await.map_err(db_error)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = txn.rollback().await {
                tracing::warn!(error = %rollback, "Rollback failed");
            }
            Err(err)
        }
    }
}

/// Map a sea-orm error to [`AppError`].
///
/// Unique constraint violations become [`AppError::Conflict`].
#[must_use]
pub fn db_error(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            tracing::debug!(detail = %detail, "Unique constraint violated");
            AppError::Conflict("Resource already exists".to_string())
        }
        _ => AppError::Database(err.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_finish_commits_on_ok() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let txn = begin(&db).await.unwrap();
        let value = finish(txn, Ok(7)).await.unwrap();
        assert_eq!(value, 7);

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("COMMIT"));
        assert!(!log.contains("ROLLBACK"));
    }

    #[tokio::test]
    async fn test_finish_rolls_back_and_keeps_error() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let txn = begin(&db).await.unwrap();
        let result: AppResult<()> = finish(txn, Err(AppError::NotFound("gone".into()))).await;
        assert!(matches!(result, Err(AppError::NotFound(msg)) if msg == "gone"));

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("ROLLBACK"));
    }

    #[test]
    fn test_db_error_maps_generic_faults() {
        let err = db_error(DbErr::Custom("boom".into()));
        assert!(matches!(err, AppError::Database(msg) if msg.contains("boom")));
    }
}
