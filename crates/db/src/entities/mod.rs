//! Database entities.

pub mod image;
pub mod image_tag;
pub mod like;
pub mod tag;
pub mod user;

pub use image::Entity as Image;
pub use image_tag::Entity as ImageTag;
pub use like::Entity as Like;
pub use tag::Entity as Tag;
pub use user::Entity as User;
