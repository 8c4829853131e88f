use axum::{Router, middleware::from_fn, routing::get};

use crate::middleware::bridge_middleware;

pub mod siteminder;
pub mod system;

/// All routes. Every route above the `route_layer` passes through the bridge;
/// logout and health do not, so they never log the caller back in.
pub fn router() -> Router {
    Router::new()
        .route("/", get(system::whoami))
        .route("/siteminder/login", get(siteminder::login))
        .route_layer(from_fn(bridge_middleware))
        .route("/siteminder/logout", get(siteminder::logout))
        .route("/health", get(system::health))
}
