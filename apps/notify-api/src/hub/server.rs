//! WebSocket upgrade handler and per-connection event loop.
//!
//! The hub channel is one-way: the server pushes notification frames, the
//! client only keeps the socket alive. Authentication is optional at the
//! transport level — a missing or invalid token downgrades the connection to
//! anonymous (no presence tracking, no targeted delivery) instead of
//! rejecting the upgrade.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::header::{AUTHORIZATION, HOST};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use signet_common::id::{prefix, prefixed_ulid};
use tokio::sync::mpsc;

use crate::auth::claims;
use crate::AppState;

use super::session::HubPrincipal;

pub fn router() -> Router<AppState> {
    Router::new().route("/hub", get(ws_upgrade))
}

#[derive(Debug, Deserialize)]
struct HubQuery {
    /// Browser WebSocket clients cannot set headers, so the token may ride
    /// in the query string instead.
    access_token: Option<String>,
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<HubQuery>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let token = query.access_token.clone().or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string)
    });
    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    ws.on_upgrade(move |socket| handle_connection(socket, state, token, host))
}

async fn handle_connection(
    socket: WebSocket,
    state: AppState,
    token: Option<String>,
    host: Option<String>,
) {
    // A bad token downgrades to anonymous rather than closing the socket.
    let principal: Option<HubPrincipal> = match token {
        Some(token) => {
            match claims::verify_bearer(&state.jwks, &state.config.issuer_url, &token).await {
                Ok(c) => Some(c.into_principal()),
                Err(e) => {
                    tracing::debug!(?e, "hub token rejected, continuing as anonymous");
                    None
                }
            }
        }
        None => None,
    };

    let connection_id = prefixed_ulid(prefix::CONNECTION);
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel();
    state.hub.connect(&connection_id, frame_tx);

    let session = state
        .sessions
        .on_connected(&connection_id, principal.as_ref(), host.as_deref())
        .await;

    tracing::info!(
        %connection_id,
        registered = session.is_registered(),
        "hub connection established"
    );

    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            // Outbound frame queued by the dispatcher.
            frame = frame_rx.recv() => {
                match frame {
                    Some(frame) => {
                        let json = match serde_json::to_string(&frame) {
                            Ok(json) => json,
                            Err(e) => {
                                tracing::error!(?e, %connection_id, "frame serialization failed");
                                continue;
                            }
                        };
                        if ws_tx.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            // Inbound traffic: only liveness signals matter.
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue, // one-way channel — client payloads are ignored
                    Some(Err(e)) => {
                        tracing::debug!(?e, %connection_id, "ws read error");
                        break;
                    }
                }
            }
        }
    }

    // Graceful close and network failure take the same removal path.
    state
        .sessions
        .on_disconnected(&session, &state.shutdown)
        .await;

    tracing::info!(%connection_id, "hub connection closed");
}
