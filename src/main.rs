//! Chat Relay server
//!
//! Loads configuration from the environment, wires the in-memory adapters and
//! serves the WebSocket relay until SIGINT or SIGTERM.

use std::error::Error;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chat_relay::adapters::websocket::{
    relay_router, Registry, RegistryConfig, RelayState, SessionServices, SessionSettings,
};
use chat_relay::adapters::{InMemoryChatStore, InMemoryDirectory, JwtTokenService};
use chat_relay::config::{AppConfig, RelayConfig, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    info!(
        environment = %config.server.environment,
        "Starting chat relay..."
    );

    let verifier = Arc::new(JwtTokenService::new(
        &config.auth.jwt_secret,
        config.auth.issuer.clone(),
        config.auth.audience.clone(),
        config.auth.token_expiry_hours,
    ));

    let directory = match &config.directory.seed_path {
        Some(path) => {
            let directory = InMemoryDirectory::from_seed_file(path)?;
            info!(
                path = %path,
                users = directory.user_count().await,
                groups = directory.group_count().await,
                "Directory seeded"
            );
            directory
        }
        None => {
            warn!("No directory seed configured; every authentication will fail with user not found");
            InMemoryDirectory::new()
        }
    };
    let store = Arc::new(InMemoryChatStore::new());

    let (registry, registry_task) = Registry::spawn(registry_config(&config.relay));
    let services = Arc::new(SessionServices::new(verifier, Arc::new(directory), store));
    let state = RelayState::new(
        services,
        registry,
        session_settings(&config.relay),
        config.relay.outbound_buffer,
        config.server.close_grace(),
    );

    let app = relay_router(&config.server.ws_path)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.server))
        .with_state(state);

    let addr = config.server.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(ws_path = %config.server.ws_path, "Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Sessions still hold registry handles; stop the task rather than wait.
    registry_task.abort();
    info!("Chat relay stopped");

    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    if server.is_production() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

fn registry_config(relay: &RelayConfig) -> RegistryConfig {
    RegistryConfig {
        queue_capacity: relay.registry_queue_capacity,
        max_consecutive_drops: relay.max_consecutive_drops,
        include_sender_in_group_fanout: relay.include_sender_in_group_fanout,
        handoff_timeout: relay.handoff_timeout(),
    }
}

fn session_settings(relay: &RelayConfig) -> SessionSettings {
    SessionSettings {
        auth_timeout: relay.auth_timeout(),
        handoff_timeout: relay.handoff_timeout(),
    }
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .allowed_origins()
        .into_iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_headers(Any);

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
