//! HTTP API layer for artfeed.
//!
//! - **Endpoints**: auth, images, likes and users as JSON routes
//! - **Extractors**: required, optional and refresh-token sessions
//! - **Middleware**: access-token cookie resolution
//!
//! Built on Axum 0.8. Sessions live in two http-only cookies.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;
pub mod session;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware};
pub use session::CookieSettings;
