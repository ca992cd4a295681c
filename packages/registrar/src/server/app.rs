//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::RegistrationConfig;
use crate::domains::registration::RegistrationWorkflow;
use crate::kernel::ServerDeps;
use crate::server::routes::{health_handler, registration_webhook_handler};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: Arc<ServerDeps>,
    pub workflow: RegistrationWorkflow,
    /// Content the registration webhook posts alongside the form embed
    pub registration_marker: Arc<str>,
}

impl AppState {
    pub fn new(deps: Arc<ServerDeps>, config: RegistrationConfig, marker: &str) -> Self {
        Self {
            workflow: RegistrationWorkflow::new(deps.clone(), config),
            deps,
            registration_marker: Arc::from(marker),
        }
    }
}

/// Build the Axum application router
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/webhooks/registrations", post(registration_webhook_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
