// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The real-time hub's single-owner actor (spec §4.7): one task owns the
//! client set, driven by four inbound channels (register, unregister,
//! broadcast, sweep). No lock ever guards the client set itself.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use xport_core::Clock;

use crate::client::{
    ClientId, ClientKind, ClientSnapshot, RegisteredClient, DEFAULT_CLIENT_CHANNEL_CAPACITY,
};
use crate::message::{Message, MessageType};

/// Default ping interval; idle clients are swept after 2x this (spec
/// §4.7).
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);

/// How often the sweep command fires on the command channel.
const SWEEP_INTERVAL: Duration = Duration::from_secs(5);

enum Command {
    Register { id: ClientId, kind: ClientKind, sender: mpsc::Sender<Message>, reply: oneshot::Sender<()> },
    Unregister { id: ClientId },
    Ping { id: ClientId },
    Broadcast { message_type: MessageType, data: serde_json::Value },
    Snapshot { reply: oneshot::Sender<Vec<ClientSnapshot>> },
    Sweep,
    Stop { reply: oneshot::Sender<()> },
}

/// Handle to the running hub actor. Cloning is cheap; every clone shares
/// the same owner task and command channel.
#[derive(Clone)]
pub struct Hub {
    commands: mpsc::Sender<Command>,
}

struct HubState<C: Clock> {
    clients: HashMap<ClientId, RegisteredClient>,
    clock: C,
    ping_interval: Duration,
}

impl<C: Clock> HubState<C> {
    fn broadcast(&mut self, message_type: MessageType, data: serde_json::Value) {
        let timestamp = self.clock.epoch_ms();
        let message = Message::new(message_type, data, timestamp);
        let mut evicted = Vec::new();
        for (id, client) in self.clients.iter() {
            if client.sender.try_send(message.clone()).is_err() {
                evicted.push(*id);
            }
        }
        for id in evicted {
            if let Some(client) = self.clients.remove(&id) {
                tracing::info!(client_id = %id, kind = ?client.kind, "evicted slow consumer");
            }
        }
    }

    fn sweep(&mut self) {
        let now = self.clock.epoch_ms();
        let stale_after = self.ping_interval.as_millis() as u64 * 2;
        let stale: Vec<ClientId> = self
            .clients
            .iter()
            .filter(|(_, c)| now.saturating_sub(c.last_ping_ms) > stale_after)
            .map(|(id, _)| *id)
            .collect();
        for id in stale {
            self.clients.remove(&id);
            tracing::info!(client_id = %id, "pruned idle client");
        }
    }
}

impl Hub {
    /// Spawns the owner task and returns a cheap, cloneable handle. The
    /// returned `JoinHandle` resolves once `stop()` has drained the
    /// owner task.
    pub fn spawn<C: Clock + Send + 'static>(clock: C, ping_interval: Duration) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Command>(256);
        let sweep_tx = tx.clone();

        let handle = tokio::spawn(async move {
            let mut state = HubState { clients: HashMap::new(), clock, ping_interval };
            let mut sweep_timer = tokio::time::interval(SWEEP_INTERVAL);
            sweep_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    cmd = rx.recv() => {
                        let Some(cmd) = cmd else { break };
                        match cmd {
                            Command::Register { id, kind, sender, reply } => {
                                let now = state.clock.epoch_ms();
                                state.clients.insert(id, RegisteredClient {
                                    id,
                                    kind,
                                    sender,
                                    connected_at_ms: now,
                                    last_ping_ms: now,
                                });
                                let _ = reply.send(());
                            }
                            Command::Unregister { id } => {
                                state.clients.remove(&id);
                            }
                            Command::Ping { id } => {
                                if let Some(client) = state.clients.get_mut(&id) {
                                    client.last_ping_ms = state.clock.epoch_ms();
                                }
                            }
                            Command::Broadcast { message_type, data } => {
                                state.broadcast(message_type, data);
                            }
                            Command::Snapshot { reply } => {
                                let snapshot = state.clients.values().map(ClientSnapshot::from).collect();
                                let _ = reply.send(snapshot);
                            }
                            Command::Sweep => state.sweep(),
                            Command::Stop { reply } => {
                                state.clients.clear();
                                let _ = reply.send(());
                                break;
                            }
                        }
                    }
                    _ = sweep_timer.tick() => {
                        let _ = sweep_tx.try_send(Command::Sweep);
                    }
                }
            }
        });

        (Self { commands: tx }, handle)
    }

    pub async fn register_client(&self, kind: ClientKind) -> (ClientId, mpsc::Receiver<Message>) {
        let id = ClientId::new();
        let (sender, receiver) = mpsc::channel(DEFAULT_CLIENT_CHANNEL_CAPACITY);
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .commands
            .send(Command::Register { id, kind, sender, reply: reply_tx })
            .await
            .is_ok()
        {
            let _ = reply_rx.await;
        }
        (id, receiver)
    }

    pub async fn unregister_client(&self, id: ClientId) {
        let _ = self.commands.send(Command::Unregister { id }).await;
    }

    pub async fn update_client_ping(&self, id: ClientId) {
        let _ = self.commands.send(Command::Ping { id }).await;
    }

    pub async fn broadcast_message(&self, message_type: MessageType, data: serde_json::Value) {
        let _ = self.commands.send(Command::Broadcast { message_type, data }).await;
    }

    pub async fn connected_clients(&self) -> Vec<ClientSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.commands.send(Command::Snapshot { reply: reply_tx }).await.is_err() {
            return Vec::new();
        }
        reply_rx.await.unwrap_or_default()
    }

    /// Closes every client channel and stops the owner task. Idempotent:
    /// once the owner task has exited, further calls are no-ops.
    pub async fn stop(&self) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.commands.send(Command::Stop { reply: reply_tx }).await.is_ok() {
            let _ = reply_rx.await;
        }
    }
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;
