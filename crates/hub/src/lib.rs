// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! xport-hub: the real-time push hub (spec §4.7) — a single-owner actor
//! fanning `Message` out to WebSocket and SSE clients over bounded
//! per-client channels, with slow-consumer eviction and idle-client
//! sweeping.

pub mod client;
pub mod hub;
pub mod message;
pub mod transports;

pub use client::{ClientId, ClientKind, ClientSnapshot, DEFAULT_CLIENT_CHANNEL_CAPACITY};
pub use hub::{Hub, DEFAULT_PING_INTERVAL};
pub use message::{Message, MessageType};
