use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::handlers;
use crate::state::AppState;

/// Assembles the full application router.
///
/// Kept out of `main` so the integration tests can drive the exact same
/// stack over an in-memory store.
pub fn router(state: AppState) -> Router {
    let create_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(100)
            .use_headers()
            .finish()
            .unwrap(),
    );

    let create_routes = Router::new()
        .route("/api/mailbox", post(handlers::mailbox::create_mailbox))
        .layer(tower_governor::GovernorLayer::new(create_governor_conf))
        .with_state(state.clone());

    let mailbox_routes = Router::new()
        .route(
            "/api/mailbox/{mailbox_id}/messages",
            get(handlers::mailbox::list_messages),
        )
        .route(
            "/api/mailbox/{mailbox_id}",
            delete(handlers::mailbox::delete_mailbox),
        )
        .with_state(state.clone());

    let ingest_routes = Router::new()
        .route("/api/ingest/email", post(handlers::ingest::receive_email))
        .with_state(state.clone());

    let version_routes = Router::new()
        .route("/api/version", get(handlers::version::get_version))
        .with_state(state.clone());

    // The ingestion webhook and the version endpoint are called from
    // anywhere; mirror the original's open CORS policy.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(create_routes)
        .merge(mailbox_routes)
        .merge(ingest_routes)
        .merge(version_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
}
