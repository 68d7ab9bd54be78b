//! Shared DTOs for the transport boundary.
//!
//! DESIGN
//! ======
//! Field names follow the realtime service's camelCase wire schema so cached
//! logs and server replays deserialize through the same type. Inbound pushes
//! stay loosely typed until `MessageReconciler::append_inbound` validates them.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Serialize};

/// A single chat message as shown in the reconciled log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Stable dedup key. The service calls this `permId`.
    #[serde(alias = "permId")]
    pub id: String,
    /// Server-generated notification rather than user content.
    #[serde(default)]
    pub is_system_message: bool,
    #[serde(rename = "userNickname", default)]
    pub sender_nickname: String,
    #[serde(rename = "userIcon", default)]
    pub sender_icon: String,
    #[serde(default)]
    pub body: String,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: i64,
}

/// Message types understood by the realtime service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    CreateSession,
    JoinSession,
    SendMessage,
    SetTypingPresence,
}

impl MessageKind {
    /// Wire name of the message type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateSession => "createSession",
            Self::JoinSession => "joinSession",
            Self::SendMessage => "sendMessage",
            Self::SetTypingPresence => "setTypingPresence",
        }
    }

    /// Parse a wire name.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "createSession" => Some(Self::CreateSession),
            "joinSession" => Some(Self::JoinSession),
            "sendMessage" => Some(Self::SendMessage),
            "setTypingPresence" => Some(Self::SetTypingPresence),
            _ => None,
        }
    }
}

/// Asynchronous push from the server, keyed by event type.
#[derive(Clone, Debug, PartialEq)]
pub enum InboundEvent {
    /// A chat message broadcast to the room. Payload is unvalidated.
    SendMessage(serde_json::Value),
    /// Typing indicator update; not rendered by this client.
    TypingPresence(serde_json::Value),
    /// Any other event type.
    Other { kind: String, data: serde_json::Value },
}

impl InboundEvent {
    /// Classify a raw `{ type, data }` push.
    #[must_use]
    pub fn from_wire(kind: &str, data: serde_json::Value) -> Self {
        match MessageKind::parse(kind) {
            Some(MessageKind::SendMessage) => Self::SendMessage(data),
            Some(MessageKind::SetTypingPresence) => Self::TypingPresence(data),
            _ => Self::Other { kind: kind.to_owned(), data },
        }
    }

    /// Wire name of the event type.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::SendMessage(_) => MessageKind::SendMessage.as_str(),
            Self::TypingPresence(_) => MessageKind::SetTypingPresence.as_str(),
            Self::Other { kind, .. } => kind,
        }
    }
}

/// Reply to a room join: the full history replay.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JoinReply {
    pub messages: Vec<ChatMessage>,
}

/// Payload of an outgoing `sendMessage`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageData {
    pub body: String,
    pub user_nickname: String,
    pub user_icon: String,
    /// Id of the local echo, so a server echo can be matched back.
    pub perm_id: String,
}

impl SendMessageData {
    /// Outgoing payload for a locally echoed message.
    #[must_use]
    pub fn from_local(msg: &ChatMessage) -> Self {
        Self {
            body: msg.body.clone(),
            user_nickname: msg.sender_nickname.clone(),
            user_icon: msg.sender_icon.clone(),
            perm_id: msg.id.clone(),
        }
    }
}
