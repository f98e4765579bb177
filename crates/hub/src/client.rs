// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client identity and transport kind (spec §3, `Client`).

use tokio::sync::mpsc;

use crate::message::Message;

xport_core::define_id! {
    /// Identity of one connected real-time client (WebSocket or SSE).
    pub struct ClientId("clt-");
}

/// Default bounded outgoing-channel capacity per client (spec §4.7).
pub const DEFAULT_CLIENT_CHANNEL_CAPACITY: usize = 64;

/// Which transport a client connected over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKind {
    Ws,
    Sse,
}

/// A registered real-time client as seen by the hub's owner task. Holds
/// the sending half of the client's outgoing queue; the transport handler
/// holds the receiving half.
pub struct RegisteredClient {
    pub id: ClientId,
    pub kind: ClientKind,
    pub sender: mpsc::Sender<Message>,
    pub connected_at_ms: u64,
    pub last_ping_ms: u64,
}

/// A point-in-time view of one connected client, returned by
/// `connectedClients()`. Carries no channel handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientSnapshot {
    pub id: ClientId,
    pub kind: ClientKind,
    pub connected_at_ms: u64,
    pub last_ping_ms: u64,
}

impl From<&RegisteredClient> for ClientSnapshot {
    fn from(c: &RegisteredClient) -> Self {
        Self {
            id: c.id,
            kind: c.kind,
            connected_at_ms: c.connected_at_ms,
            last_ping_ms: c.last_ping_ms,
        }
    }
}
