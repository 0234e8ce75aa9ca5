mod config;
mod errors;
mod generation;
mod models;
mod providers;
mod routes;
mod settings;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::providers::{ProviderGateway, ProviderId};
use crate::routes::build_router;
use crate::settings::ProviderSettings;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Mobilia API v{}", env!("CARGO_PKG_VERSION"));

    // Runtime provider configuration, seeded from the environment. The admin
    // endpoints mutate this at runtime; the gateway reads it on every call.
    let settings = Arc::new(ProviderSettings::new(&config.default_provider));
    seed_api_keys(&settings, &config);
    info!("current provider: {}", settings.current_provider());

    let gateway = Arc::new(ProviderGateway::new(&config, Arc::clone(&settings)));
    info!("provider gateway initialized");

    let state = AppState {
        gateway,
        settings,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn seed_api_keys(settings: &ProviderSettings, config: &Config) {
    if let Some(key) = &config.groq_api_key {
        settings.set_api_key(ProviderId::Groq, key);
    }
    if let Some(key) = &config.gemini_api_key {
        settings.set_api_key(ProviderId::Gemini, key);
    }
    if let Some(key) = &config.huggingface_api_key {
        settings.set_api_key(ProviderId::HuggingFace, key);
    }
    if let Some(key) = &config.openai_api_key {
        settings.set_api_key(ProviderId::OpenAi, key);
    }
}
