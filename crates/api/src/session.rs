//! Session cookies.

#![allow(missing_docs)]

use artfeed_common::config::AuthConfig;
use artfeed_core::TokenPair;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

/// Names of the two session cookies.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub access_name: String,
    pub refresh_name: String,
}

impl CookieSettings {
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            access_name: config.access_token_cookie_name.clone(),
            refresh_name: config.refresh_token_cookie_name.clone(),
        }
    }

    /// Store both tokens as http-only cookies.
    #[must_use]
    pub fn start(&self, jar: CookieJar, tokens: TokenPair) -> CookieJar {
        jar.add(session_cookie(self.access_name.clone(), tokens.access))
            .add(session_cookie(self.refresh_name.clone(), tokens.refresh))
    }

    /// Expire both cookies.
    #[must_use]
    pub fn end(&self, jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build(self.access_name.clone()).path("/"))
            .remove(Cookie::build(self.refresh_name.clone()).path("/"))
    }
}

fn session_cookie(name: String, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}
