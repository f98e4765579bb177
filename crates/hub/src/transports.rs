// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `/ws` and `/events` HTTP transports (spec §4.7): both translate
//! [`Message`] into their own framing, maintain liveness, and unregister
//! the client on EOF or error.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::Stream;

use crate::client::ClientKind;
use crate::hub::{Hub, DEFAULT_PING_INTERVAL};

pub fn router(hub: Hub) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/events", get(sse_handler))
        .with_state(hub)
}

async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<Hub>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, hub))
}

async fn handle_ws(mut socket: WebSocket, hub: Hub) {
    let (id, mut receiver) = hub.register_client(ClientKind::Ws).await;
    let mut ping_timer = tokio::time::interval(DEFAULT_PING_INTERVAL);
    ping_timer.tick().await;

    loop {
        tokio::select! {
            outgoing = receiver.recv() => {
                let Some(message) = outgoing else { break };
                let payload = match serde_json::to_string(&message) {
                    Ok(payload) => payload,
                    Err(_) => continue,
                };
                if socket.send(WsMessage::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(WsMessage::Pong(_))) | Some(Ok(WsMessage::Ping(_))) => {
                        hub.update_client_ping(id).await;
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    Some(Ok(_)) => {}
                }
            }
            _ = ping_timer.tick() => {
                if socket.send(WsMessage::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }

    hub.unregister_client(id).await;
}

struct SseState {
    hub: Hub,
    id: crate::client::ClientId,
    receiver: tokio::sync::mpsc::Receiver<crate::message::Message>,
    ping_timer: tokio::time::Interval,
}

async fn sse_handler(
    State(hub): State<Hub>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (id, receiver) = hub.register_client(ClientKind::Sse).await;
    let mut ping_timer = tokio::time::interval(DEFAULT_PING_INTERVAL);
    ping_timer.tick().await;

    let state = SseState { hub, id, receiver, ping_timer };

    // Driven purely by polling: the stream ends, and the client is
    // unregistered, exactly when the sender side (the hub, on eviction or
    // `stop()`) closes the channel — no separate task to leak.
    let stream = futures_util::stream::unfold(state, |mut state| async move {
        loop {
            tokio::select! {
                outgoing = state.receiver.recv() => {
                    return match outgoing {
                        Some(message) => {
                            let event = Event::default()
                                .json_data(&message)
                                .unwrap_or_else(|_| Event::default().data("{}"));
                            Some((Ok(event), state))
                        }
                        None => {
                            state.hub.unregister_client(state.id).await;
                            None
                        }
                    };
                }
                _ = state.ping_timer.tick() => {
                    state.hub.update_client_ping(state.id).await;
                    return Some((Ok(Event::default().comment("ping")), state));
                }
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[cfg(test)]
#[path = "transports_tests.rs"]
mod tests;
