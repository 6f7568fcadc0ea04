//! storeline-notify server binary.
//!
//! Loads configuration, wires the adapters together and serves the WebSocket
//! endpoint. Background tasks: the Redis event bridge subscription and the
//! idle connection sweeper.

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use storeline_notify::adapters::auth::JwtTokenVerifier;
use storeline_notify::adapters::events::{EventBridge, RedisEventPublisher};
use storeline_notify::adapters::http::{cors_layer, router, AppState};
use storeline_notify::adapters::socket::{ConnectionRegistry, IdleSweeper, RoomManager};
use storeline_notify::config::{AppConfig, ConfigError, ValidationError};

#[derive(Debug, Error)]
enum BootError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("configuration validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), BootError> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .init();

    tracing::info!(
        environment = %config.server.environment,
        channel = %config.redis.channel,
        "starting storeline-notify"
    );

    let registry = Arc::new(ConnectionRegistry::new());
    let rooms = Arc::new(RoomManager::new(Arc::clone(&registry)));

    let redis_client = redis::Client::open(config.redis.url.as_str())?;
    let publisher =
        RedisEventPublisher::connect(&redis_client, config.redis.channel.clone()).await?;

    let bridge = Arc::new(EventBridge::new(
        redis_client,
        config.redis.channel.clone(),
        Arc::clone(&rooms),
    ));
    tokio::spawn(bridge.run());

    let sweeper = IdleSweeper::new(
        Arc::clone(&registry),
        config.socket.idle_timeout(),
        config.socket.sweep_interval(),
    );
    tokio::spawn(sweeper.run());

    let state = AppState {
        verifier: Arc::new(JwtTokenVerifier::new(
            &config.auth.token_secret,
            config.auth.leeway_secs,
        )),
        registry,
        rooms,
        publisher: Arc::new(publisher),
    };

    let cors = cors_layer(&config.server.cors_origins_list());
    let app = router(state, cors);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
