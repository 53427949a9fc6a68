//! Business logic services.

#![allow(missing_docs)]

pub mod auth;
pub mod generation;
pub mod image;
pub mod jobs;
pub mod like;
pub mod password;
pub mod token;
pub mod user;

pub use auth::{AuthService, LoginInput, RegisterInput};
pub use generation::{CloudflareClient, ImageHost, ImageModel, ImgbbClient, normalize_tag};
pub use image::{CreateImageInput, ImageDetails, ImageService};
pub use jobs::{DailyGenerationsJob, duration_until_next_midnight};
pub use like::{LikeService, PlaceLikeInput};
pub use token::{Claims, TokenKind, TokenPair, TokenService};
pub use user::UserService;
