//! HTTP surface over the log and the verification service

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::verification::VerificationService;

#[derive(Clone)]
pub struct AppState {
    pub service: VerificationService,
}

pub fn router(service: VerificationService) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ct-check", post(handlers::ct_check))
        .route("/add-certificate", post(handlers::add_certificate))
        .route("/merkle-root", get(handlers::merkle_root))
        .route("/ct-logs", get(handlers::list_logs))
        .route("/ct-logs/:domain", get(handlers::list_domain))
        .route("/proof/:index", get(handlers::proof))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .into_inner(),
        )
        .with_state(AppState { service })
}
