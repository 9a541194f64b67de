mod config;
mod document;
mod errors;
mod export;
mod generation;
mod identity;
mod llm_client;
mod models;
mod reconcile;
mod regeneration;
mod routes;
mod session;
mod state;
mod tailoring;
#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, GeneratorBackend};
use crate::generation::{GenerationServiceClient, LlmProfileGenerator, ProfileGenerator};
use crate::identity::{HttpIdentityClient, IdentityProvider};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::session::{SessionRegistry, SessionServices};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on a missing generator backend)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cvstudio API v{}", env!("CARGO_PKG_VERSION"));

    let generator = build_generator(&config)?;
    let identity = build_identity(&config)?;

    let services = SessionServices {
        generator,
        identity,
        generation_timeout: config.generation_timeout,
        identity_timeout: config.identity_timeout,
    };
    let sessions = Arc::new(SessionRegistry::new(services));
    sessions.spawn_sweeper(config.session_idle);
    let state = AppState {
        config: config.clone(),
        sessions,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the editor frontend

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_generator(config: &Config) -> Result<Arc<dyn ProfileGenerator>> {
    match config.generator_backend() {
        Some(GeneratorBackend::Remote(url)) => {
            let client = GenerationServiceClient::new(url.clone(), config.generation_timeout)
                .context("Failed to build generation service client")?;
            info!("Generator backend: remote service at {url}");
            Ok(Arc::new(client))
        }
        Some(GeneratorBackend::Anthropic(api_key)) => {
            let llm = LlmClient::new(api_key, config.generation_timeout)
                .context("Failed to build LLM client")?;
            info!("Generator backend: LLM (model: {})", llm_client::MODEL);
            Ok(Arc::new(LlmProfileGenerator::new(llm)))
        }
        None => anyhow::bail!("No generator backend configured"),
    }
}

fn build_identity(config: &Config) -> Result<Option<Arc<dyn IdentityProvider>>> {
    let Some(url) = &config.identity_service_url else {
        warn!("IDENTITY_SERVICE_URL not set; profile import is unavailable");
        return Ok(None);
    };
    let client = HttpIdentityClient::new(url.clone(), config.identity_timeout)
        .context("Failed to build identity client")?;
    info!("Identity service at {url}");
    Ok(Some(Arc::new(client)))
}
