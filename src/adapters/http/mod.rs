//! HTTP surface: the WebSocket upgrade route and a health endpoint.

use std::sync::Arc;

use axum::{extract::State, http::HeaderValue, routing::get, Json, Router};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::adapters::socket::{ws_handler, ConnectionRegistry, RoomManager};
use crate::ports::{EventPublisher, TokenVerifier};

/// Shared handles every request handler needs.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<dyn TokenVerifier>,
    pub registry: Arc<ConnectionRegistry>,
    pub rooms: Arc<RoomManager>,
    pub publisher: Arc<dyn EventPublisher>,
}

/// Build the application router.
pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS policy from the configured origin list; permissive when unset.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new().allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new().allow_origin(origins)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    connections: usize,
    users: usize,
    rooms: usize,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        connections: state.registry.connection_count().await,
        users: state.registry.user_count().await,
        rooms: state.rooms.room_count().await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_origin_list_is_permissive() {
        // Builds without panicking; Any has no origin list to inspect.
        let _ = cors_layer(&[]);
    }

    #[test]
    fn bad_origins_are_skipped() {
        let _ = cors_layer(&["http://localhost:3000".into(), "bad\norigin".into()]);
    }
}
