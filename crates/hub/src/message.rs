// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The wire payload broadcast to every connected real-time client (spec
//! §3, `Message`).

use serde::{Deserialize, Serialize};

use xport_core::ExportReport;

/// Closed set of message kinds the hub ever broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageType {
    Status,
    Health,
    ExportProgress,
    TokenUpdate,
    Alert,
    LogEntry,
}

/// One broadcast unit: a type tag, an opaque JSON payload, and the
/// timestamp the hub stamped it with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub data: serde_json::Value,
    pub timestamp: u64,
}

impl Message {
    pub fn new(message_type: MessageType, data: serde_json::Value, timestamp_ms: u64) -> Self {
        Self { message_type, data, timestamp: timestamp_ms }
    }

    pub fn export_progress(report: &ExportReport, timestamp_ms: u64) -> Self {
        Self::new(
            MessageType::ExportProgress,
            serde_json::json!(report),
            timestamp_ms,
        )
    }
}
