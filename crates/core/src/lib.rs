//! Core business logic for artfeed.

pub mod services;

pub use services::*;
