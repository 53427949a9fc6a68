//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Token and cookie configuration.
    pub auth: AuthConfig,
    /// Image and tag generation model configuration.
    pub cloudflare: CloudflareConfig,
    /// Image hosting configuration.
    pub imgbb: ImgbbConfig,
    /// Daily generation allotment.
    #[serde(default)]
    pub generations: GenerationsConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Token signing and cookie configuration.
#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret used to sign tokens.
    pub secret_key: String,
    /// Name of the cookie carrying the access token.
    #[serde(default = "default_access_cookie")]
    pub access_token_cookie_name: String,
    /// Name of the cookie carrying the refresh token.
    #[serde(default = "default_refresh_cookie")]
    pub refresh_token_cookie_name: String,
    /// JWT signing algorithm, e.g. `HS256`.
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// Access token lifetime.
    #[serde(default = "default_access_minutes")]
    pub access_token_expire_minutes: i64,
    /// Refresh token lifetime.
    #[serde(default = "default_refresh_days")]
    pub refresh_token_expire_days: i64,
}

// Keeps the secret out of logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret_key", &"<redacted>")
            .field("access_token_cookie_name", &self.access_token_cookie_name)
            .field("refresh_token_cookie_name", &self.refresh_token_cookie_name)
            .field("algorithm", &self.algorithm)
            .field("access_token_expire_minutes", &self.access_token_expire_minutes)
            .field("refresh_token_expire_days", &self.refresh_token_expire_days)
            .finish()
    }
}

/// Cloudflare Workers AI configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudflareConfig {
    /// API token.
    pub api_key: String,
    /// Account the models run under.
    pub account_id: String,
    /// Text-to-image model.
    #[serde(default = "default_images_model")]
    pub images_model_name: String,
    /// Vision model used to tag generated images.
    #[serde(default = "default_tags_model")]
    pub tags_model_name: String,
    /// Generated image height in pixels.
    #[serde(default = "default_image_height")]
    pub image_height: u32,
    /// Generated image width in pixels.
    #[serde(default = "default_image_width")]
    pub image_width: u32,
    /// Per-request timeout.
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
    /// API base URL.
    #[serde(default = "default_cloudflare_url")]
    pub base_url: String,
}

/// imgbb image hosting configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ImgbbConfig {
    /// API key.
    pub api_key: String,
    /// Per-request timeout.
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
    /// API base URL.
    #[serde(default = "default_imgbb_url")]
    pub base_url: String,
}

/// Daily generation quota configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationsConfig {
    /// Generations granted to every user each day.
    #[serde(default = "default_generations_per_day")]
    pub per_day: i32,
    /// IANA time zone whose midnight triggers the reset.
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
}

impl Default for GenerationsConfig {
    fn default() -> Self {
        Self {
            per_day: default_generations_per_day(),
            time_zone: default_time_zone(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

fn default_access_cookie() -> String {
    "user_access_token".to_string()
}

fn default_refresh_cookie() -> String {
    "user_refresh_token".to_string()
}

fn default_algorithm() -> String {
    "HS256".to_string()
}

const fn default_access_minutes() -> i64 {
    30
}

const fn default_refresh_days() -> i64 {
    7
}

fn default_images_model() -> String {
    "@cf/leonardo/lucid-origin".to_string()
}

fn default_tags_model() -> String {
    "@cf/meta/llama-4-scout-17b-16e-instruct".to_string()
}

const fn default_image_height() -> u32 {
    1024
}

const fn default_image_width() -> u32 {
    768
}

const fn default_timeout() -> u64 {
    60
}

fn default_cloudflare_url() -> String {
    "https://api.cloudflare.com/client/v4".to_string()
}

fn default_imgbb_url() -> String {
    "https://api.imgbb.com/1".to_string()
}

const fn default_generations_per_day() -> i32 {
    5
}

fn default_time_zone() -> String {
    "UTC".to_string()
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `ARTFEED_ENV`)
    /// 3. Environment variables with `ARTFEED_` prefix, e.g. `ARTFEED_AUTH__SECRET_KEY`
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("ARTFEED_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("ARTFEED")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("ARTFEED")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
