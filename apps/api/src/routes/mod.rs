pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::session::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/sessions", post(handlers::handle_start_session))
        .route(
            "/api/v1/sessions/:id/document",
            get(handlers::handle_get_document),
        )
        .route(
            "/api/v1/sessions/:id/document/changes",
            get(handlers::handle_watch_document),
        )
        .route(
            "/api/v1/sessions/:id/fields/:key",
            put(handlers::handle_edit_field),
        )
        .route(
            "/api/v1/sessions/:id/fields/:key/:index",
            put(handlers::handle_edit_item),
        )
        .route("/api/v1/sessions/:id/import", post(handlers::handle_import))
        .route("/api/v1/sessions/:id/sample", post(handlers::handle_use_sample))
        .route(
            "/api/v1/sessions/:id/regenerate",
            post(handlers::handle_regenerate),
        )
        .route("/api/v1/sessions/:id/pending", get(handlers::handle_pending))
        .route("/api/v1/sessions/:id/tailor", post(handlers::handle_tailor))
        .route(
            "/api/v1/sessions/:id/generate",
            post(handlers::handle_generate),
        )
        .route("/api/v1/sessions/:id/export", get(handlers::handle_export))
        .route(
            "/api/v1/sessions/:id/artifact",
            get(handlers::handle_artifact),
        )
        .route("/api/v1/sessions/:id/logout", post(handlers::handle_logout))
        .with_state(state)
}
