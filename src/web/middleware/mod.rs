//! Middleware and extractors for the Web API.

pub mod auth;
pub mod cors;

pub use auth::{BasicCredentials, OptionalTokenUser, TokenUser, X_TOKEN};
pub use cors::create_cors_layer;
