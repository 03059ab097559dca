pub mod health;
pub mod page;

use axum::error_handling::HandleErrorLayer;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use std::time::Duration;
use tower::buffer::BufferLayer;
use tower::limit::RateLimitLayer;
use tower::ServiceBuilder;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    // Each submit costs one outbound scoring call.
    let submit_rate_limit = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(|_: tower::BoxError| async {
            StatusCode::TOO_MANY_REQUESTS
        }))
        .layer(BufferLayer::new(32))
        .layer(RateLimitLayer::new(30, Duration::from_secs(60)));

    // Page opens and health checks are cheap, but each can cost memory or an
    // outbound request.
    let session_rate_limit = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(|_: tower::BoxError| async {
            StatusCode::TOO_MANY_REQUESTS
        }))
        .layer(BufferLayer::new(32))
        .layer(RateLimitLayer::new(60, Duration::from_secs(60)));

    let health_rate_limit = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(|_: tower::BoxError| async {
            StatusCode::TOO_MANY_REQUESTS
        }))
        .layer(BufferLayer::new(8))
        .layer(RateLimitLayer::new(30, Duration::from_secs(60)));

    Router::new()
        .route("/", get(page::new_session).layer(session_rate_limit))
        .route(
            "/session/:id",
            get(page::show_session).merge(post(page::submit_form).layer(submit_rate_limit)),
        )
        .route("/health", get(health::health).layer(health_rate_limit))
        .with_state(state)
}
