use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::config::GeneratorBackend;
use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let backend = match state.config.generator_backend() {
        Some(GeneratorBackend::Remote(_)) => "remote",
        Some(GeneratorBackend::Anthropic(_)) => "anthropic",
        None => "none",
    };
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "cvstudio-api",
        "generator": backend,
        "sessions": state.sessions.count(),
    }))
}
