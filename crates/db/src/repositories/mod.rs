//! Repository layer.
//!
//! [`Dao`] carries the generic CRUD primitives; each repository derefs to
//! its entity's `Dao` and adds the entity-specific queries.

pub mod base;
mod image;
mod like;
mod tag;
mod user;

pub use base::Dao;
pub use image::{
    ImagePage, ImageRepository, ImageSearch, ImageWithLikes, OrderBy, SearchTerm, SortBy,
};
pub use like::LikeRepository;
pub use tag::TagRepository;
pub use user::UserRepository;
