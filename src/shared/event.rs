//! WebSocket Event Contracts
//!
//! The inbound and outbound event enums spoken over a persistent
//! connection. Events are internally tagged with a kebab-case `type` field,
//! so the wire format reads `{"type":"send-message","recipient_id":…}`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::types::Message;

/// Events a client may send over its connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Ask the server to deliver a message to another user.
    SendMessage { recipient_id: Uuid, body: String },
    /// Application-level heartbeat reply.
    Pong,
}

/// Events the server pushes to a connected client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// A message addressed to this user arrived (fan-out push).
    NewMessage { message: Message },
    /// Acknowledgement of a `send-message` request: the persisted record,
    /// including its assigned sequence number.
    MessageSent { message: Message },
    /// A user went online or offline.
    PresenceChanged { user_id: Uuid, online: bool },
    /// Point-in-time snapshot of online users, sent on connect.
    OnlineUsers { users: Vec<Uuid> },
    /// A request failed; `message` is human-readable.
    Error { message: String },
    /// Application-level heartbeat probe.
    Ping,
}
