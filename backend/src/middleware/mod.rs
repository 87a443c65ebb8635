//! Request middleware

mod auth;

pub use auth::*;
