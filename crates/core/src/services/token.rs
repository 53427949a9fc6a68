//! Access and refresh token issuance and verification.
//!
//! Tokens are JWTs carrying `{sub, exp, type}`. Every verification fault
//! collapses to [`AppError::Unauthorized`] so clients cannot tell a bad
//! signature from an expired or misused token.

use std::str::FromStr;

use artfeed_common::{AppError, AppResult, config::AuthConfig};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which slot a token is valid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claim set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    /// Expiry as a unix timestamp.
    pub exp: i64,
    #[serde(rename = "type")]
    pub kind: TokenKind,
}

/// Freshly issued access and refresh tokens.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Signs and verifies session tokens.
#[derive(Clone)]
pub struct TokenService {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    /// Build from the auth configuration. Only HMAC algorithms are
    /// accepted since the key is a shared secret.
    pub fn new(config: &AuthConfig) -> AppResult<Self> {
        let algorithm = Algorithm::from_str(&config.algorithm)
            .map_err(|e| AppError::Config(format!("Unknown token algorithm: {e}")))?;

        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(AppError::Config(format!(
                "Token algorithm {} needs a key pair, only HS256/HS384/HS512 are supported",
                config.algorithm
            )));
        }

        let secret = config.secret_key.as_bytes();
        Ok(Self {
            algorithm,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl: Duration::minutes(config.access_token_expire_minutes),
            refresh_ttl: Duration::days(config.refresh_token_expire_days),
        })
    }

    /// Issue a token of the given kind for `user_id`.
    pub fn issue(&self, user_id: Uuid, kind: TokenKind) -> AppResult<String> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (Utc::now() + ttl).timestamp(),
            kind,
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {e}")))
    }

    /// Issue both tokens.
    pub fn issue_pair(&self, user_id: Uuid) -> AppResult<TokenPair> {
        Ok(TokenPair {
            access: self.issue(user_id, TokenKind::Access)?,
            refresh: self.issue(user_id, TokenKind::Refresh)?,
        })
    }

    /// Verify `token` as a token of kind `expected` and return its subject.
    pub fn verify(&self, token: &str, expected: TokenKind) -> AppResult<Uuid> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            tracing::debug!(error = %e, "Token rejected");
            AppError::Unauthorized
        })?;

        if data.claims.kind != expected {
            tracing::debug!(kind = ?data.claims.kind, expected = ?expected, "Token used in wrong slot");
            return Err(AppError::Unauthorized);
        }

        Uuid::parse_str(&data.claims.sub).map_err(|_| AppError::Unauthorized)
    }
}
