//! Registration, login and session token lifecycle.

use artfeed_common::{AppError, AppResult};
use artfeed_db::{entities::user, repositories::UserRepository};
use sea_orm::Set;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{
    password::{hash_password, verify_password},
    token::{TokenKind, TokenPair, TokenService},
};

/// Input for registering a new user.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 4, max = 20, message = "Username must be between 4 and 20 characters long"))]
    pub username: String,

    #[validate(email(message = "Email must be valid"))]
    pub email: String,

    #[validate(length(min = 6, max = 20, message = "Password must be between 6 and 20 characters long"))]
    pub password: String,

    #[validate(
        length(min = 6, max = 20, message = "Password confirmation must be between 6 and 20 characters long"),
        must_match(other = "password", message = "Passwords do not match")
    )]
    pub confirm_password: String,
}

/// Input for logging in.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(length(min = 4, max = 20, message = "Username must be between 4 and 20 characters long"))]
    pub username: String,

    #[validate(length(min = 6, max = 20, message = "Password must be between 6 and 20 characters long"))]
    pub password: String,
}

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    tokens: TokenService,
    generations_per_day: i32,
}

impl AuthService {
    /// Create a new auth service.
    #[must_use]
    pub const fn new(user_repo: UserRepository, tokens: TokenService, generations_per_day: i32) -> Self {
        Self {
            user_repo,
            tokens,
            generations_per_day,
        }
    }

    /// Register a new user with a full daily allotment.
    pub async fn register(&self, input: RegisterInput) -> AppResult<user::Model> {
        input.validate()?;

        if self.user_repo.find_by_username(&input.username).await?.is_some() {
            return Err(AppError::Conflict("This username is already taken".to_string()));
        }
        if self.user_repo.find_by_email(&input.email).await?.is_some() {
            return Err(AppError::Conflict("This email is already taken".to_string()));
        }

        let user = self
            .user_repo
            .add(user::ActiveModel {
                username: Set(input.username),
                email: Set(input.email),
                hashed_password: Set(hash_password(&input.password)?),
                generations_left: Set(self.generations_per_day),
                ..Default::default()
            })
            .await?;

        tracing::info!(user_id = %user.id, "Registered user");
        Ok(user)
    }

    /// Check a username and password.
    ///
    /// Unknown users and wrong passwords fail the same way.
    pub async fn authenticate_user(&self, username: &str, password: &str) -> AppResult<user::Model> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or(AppError::Credentials)?;

        if !verify_password(password, &user.hashed_password)? {
            return Err(AppError::Credentials);
        }

        Ok(user)
    }

    /// Authenticate and issue a token pair.
    pub async fn login(&self, input: LoginInput) -> AppResult<(user::Model, TokenPair)> {
        input.validate()?;

        let user = self.authenticate_user(&input.username, &input.password).await?;
        let tokens = self.tokens.issue_pair(user.id)?;

        tracing::info!(user_id = %user.id, "Logged in user");
        Ok((user, tokens))
    }

    /// Resolve the user behind an access token.
    pub async fn resolve_access_token(&self, token: &str) -> AppResult<user::Model> {
        self.resolve(token, TokenKind::Access).await
    }

    /// Exchange a refresh token for a new token pair.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<(user::Model, TokenPair)> {
        let user = self.resolve(refresh_token, TokenKind::Refresh).await?;
        let tokens = self.tokens.issue_pair(user.id)?;

        tracing::info!(user_id = %user.id, "Refreshed tokens");
        Ok((user, tokens))
    }

    /// Delete an account along with its images and likes.
    pub async fn delete_account(&self, user_id: Uuid) -> AppResult<()> {
        if !self.user_repo.delete_one_by_id(user_id).await? {
            return Err(AppError::NotFound("This user does not exist".to_string()));
        }

        tracing::info!(user_id = %user_id, "Deleted user");
        Ok(())
    }

    async fn resolve(&self, token: &str, kind: TokenKind) -> AppResult<user::Model> {
        let user_id = self.tokens.verify(token, kind)?;

        self.user_repo
            .find_one_or_none_by_id(user_id)
            .await?
            .ok_or(AppError::Unauthorized)
    }
}
