//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: collaborator wiring (directory, sessions, bridge)
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: response DTOs
//! - `errors.rs`: consistent error responses and notice rendering

use axum::{Extension, Router};
use tower::ServiceBuilder;

use smbridge_auth::Settings;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(settings: Settings) -> Router {
    build_app_with(services::build_services(settings))
}

/// Build the router around already-wired services (tests seed the directory first).
pub fn build_app_with(services: AppServices) -> Router {
    let settings = services.settings.clone();

    routes::router()
        .layer(Extension(services))
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn_with_state(
            settings,
            middleware::identity_middleware,
        )))
}
