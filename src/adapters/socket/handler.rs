//! WebSocket upgrade handler and per-connection lifecycle.
//!
//! Each accepted socket runs one task that drives the connection state
//! machine: authenticate the token from the query string, register with the
//! registry and join the store room, then pump room deliveries out and
//! client messages in until the transport closes or the sweeper evicts it.

use std::borrow::Cow;

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use serde::Deserialize;

use crate::domain::foundation::{AuthError, ConnectionId, Identity, StateMachine, Timestamp};
use crate::domain::notification::{ConnectionState, InboundEvent};
use crate::ports::TokenVerifier;

use crate::adapters::http::AppState;

use super::messages::{close_code, ClientMessage, OutboundMessage, SocketCommand};

/// Query parameters accepted on the upgrade request.
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    /// Credential token; absence is an authentication failure.
    pub token: Option<String>,
}

/// Handle WebSocket upgrade requests.
///
/// Route: `GET /ws?token=<credential>`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<ConnectQuery>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, query.token, state))
}

/// Advance the lifecycle state machine, logging (not panicking) on a
/// transition the handler should never attempt.
fn advance(current: ConnectionState, next: ConnectionState) -> ConnectionState {
    match current.transition_to(next) {
        Ok(state) => state,
        Err(err) => {
            tracing::error!(error = %err, "connection state transition rejected");
            current
        }
    }
}

async fn authenticate(
    verifier: &dyn TokenVerifier,
    token: Option<&str>,
) -> Result<Identity, AuthError> {
    match token {
        Some(token) => verifier.verify(token).await,
        None => Err(AuthError::MissingToken),
    }
}

/// Drive one established connection for its lifetime.
async fn handle_socket(mut socket: WebSocket, token: Option<String>, state: AppState) {
    // Transport handshake is complete once we are here.
    let mut lifecycle = advance(ConnectionState::Connecting, ConnectionState::Authenticating);

    let identity = match authenticate(state.verifier.as_ref(), token.as_deref()).await {
        Ok(identity) => identity,
        Err(err) => {
            // No registry mutation has happened; close and stop.
            tracing::debug!(error = %err, "rejecting unauthenticated socket");
            lifecycle = advance(lifecycle, ConnectionState::Rejected);
            close(&mut socket, close_code::AUTH_FAILED, "authentication failed").await;
            advance(lifecycle, ConnectionState::Closed);
            return;
        }
    };

    let connection_id = ConnectionId::new();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let registered = match state
        .registry
        .register(connection_id, identity.clone(), tx)
        .await
    {
        Ok(registered) => registered,
        Err(err) => {
            tracing::error!(error = %err, connection = %connection_id, "closing socket");
            lifecycle = advance(lifecycle, ConnectionState::Rejected);
            close(&mut socket, close_code::DUPLICATE_CONNECTION, "duplicate connection").await;
            advance(lifecycle, ConnectionState::Closed);
            return;
        }
    };

    state.rooms.join(&identity.store_id, &identity.user_id).await;
    lifecycle = advance(lifecycle, ConnectionState::Active);

    tracing::info!(
        connection = %connection_id,
        user = %identity.user_id,
        store = %identity.store_id,
        role = %identity.role,
        "socket connected"
    );

    if registered.first_session {
        publish_presence(&state, InboundEvent::user_online(&identity)).await;
    }

    let mut forced_close: Option<u16> = None;

    if send_message(&mut socket, &OutboundMessage::connected(connection_id))
        .await
        .is_err()
    {
        // Client disconnected immediately; fall through to teardown.
        tracing::debug!(connection = %connection_id, "client gone before connected ack");
    } else {
        forced_close = pump(&mut socket, &mut rx, connection_id, &state).await;
    }

    lifecycle = advance(lifecycle, ConnectionState::Closing);

    if let Some(code) = forced_close {
        close(&mut socket, code, "connection evicted").await;
    }

    teardown(&state, connection_id, &identity).await;
    advance(lifecycle, ConnectionState::Closed);
}

/// Message pump for an active connection.
///
/// Returns the close code to send when the server itself forced the close,
/// `None` when the client side ended the connection.
async fn pump(
    socket: &mut WebSocket,
    rx: &mut tokio::sync::mpsc::UnboundedReceiver<SocketCommand>,
    connection_id: ConnectionId,
    state: &AppState,
) -> Option<u16> {
    loop {
        tokio::select! {
            inbound = socket.recv() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    state.registry.touch(connection_id).await;
                    match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(ClientMessage::Ping) => {
                            if send_message(socket, &OutboundMessage::pong()).await.is_err() {
                                return None;
                            }
                        }
                        Err(_) => {
                            tracing::trace!(connection = %connection_id, "ignoring unrecognized client message");
                        }
                    }
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                    state.registry.touch(connection_id).await;
                }
                Some(Ok(Message::Binary(_))) => {
                    tracing::warn!(connection = %connection_id, "ignoring unsupported binary message");
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::debug!(connection = %connection_id, "client closed connection");
                    return None;
                }
                Some(Err(err)) => {
                    tracing::debug!(connection = %connection_id, error = %err, "receive error");
                    return None;
                }
            },
            command = rx.recv() => match command {
                Some(SocketCommand::Deliver(message)) => {
                    if send_message(socket, &message).await.is_err() {
                        tracing::debug!(connection = %connection_id, "send failed, closing");
                        return None;
                    }
                }
                Some(SocketCommand::Close(code)) => return Some(code),
                // Sender side dropped; treat as server-initiated close.
                None => return None,
            },
        }
    }
}

/// Remove the connection from registry and room state, announcing the user
/// offline when this was their last session.
async fn teardown(state: &AppState, connection_id: ConnectionId, identity: &Identity) {
    let removed = state.registry.unregister(connection_id).await;
    state
        .rooms
        .leave(&identity.store_id, &identity.user_id)
        .await;

    match removed {
        Some(removed) => {
            let session_secs =
                Timestamp::now().as_unix_secs() - removed.connected_at.as_unix_secs();
            tracing::info!(
                connection = %connection_id,
                user = %identity.user_id,
                session_secs,
                last_session = removed.last_session,
                "socket disconnected"
            );
            if removed.last_session {
                publish_presence(state, InboundEvent::user_offline(identity)).await;
            }
        }
        // Already reaped by a broadcast; nothing left to announce.
        None => {
            tracing::debug!(connection = %connection_id, "connection already unregistered");
        }
    }
}

async fn publish_presence(state: &AppState, event: InboundEvent) {
    let event_type = event.event_type.clone();
    if let Err(err) = state.publisher.publish(event).await {
        tracing::warn!(error = %err, event_type, "failed to publish presence event");
    }
}

async fn send_message(socket: &mut WebSocket, message: &OutboundMessage) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(err) => {
            // Unreachable for this type; skip the message rather than
            // tearing the connection down.
            tracing::error!(error = %err, event_type = %message.event_type, "failed to serialize outbound message");
            return Ok(());
        }
    };
    socket.send(Message::Text(json)).await
}

async fn close(socket: &mut WebSocket, code: u16, reason: &'static str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: Cow::Borrowed(reason),
        })))
        .await;
}
