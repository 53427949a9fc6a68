//! User service.

use artfeed_common::{AppError, AppResult};
use artfeed_db::{entities::user, repositories::UserRepository};
use uuid::Uuid;

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self { user_repo }
    }

    /// Get a user by ID.
    pub async fn get(&self, id: Uuid) -> AppResult<user::Model> {
        self.user_repo
            .find_one_or_none_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("This user does not exist".to_string()))
    }
}
