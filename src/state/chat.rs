//! View state for the chat page.
//!
//! The session publishes a fresh `ChatState` after every mutation; the page
//! keeps it in a signal and renders it read-only.

#[cfg(test)]
#[path = "chat_test.rs"]
mod chat_test;

use crate::net::types::ChatMessage;
use crate::state::room::RoomPhase;

/// Coarse session status for rendering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionStatus {
    #[default]
    Idle,
    Connecting,
    Resolving,
    Joined,
    /// The connection dropped or the view was disposed.
    Disconnected,
    /// Room creation or join was rejected.
    Failed,
}

impl SessionStatus {
    pub fn from_phase(phase: &RoomPhase) -> Self {
        match phase {
            RoomPhase::Idle => Self::Idle,
            RoomPhase::Connecting => Self::Connecting,
            RoomPhase::RoomResolving => Self::Resolving,
            RoomPhase::Joined => Self::Joined,
            RoomPhase::Closed => Self::Disconnected,
            RoomPhase::Failed(_) => Self::Failed,
        }
    }

    /// Short human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Starting...",
            Self::Connecting => "Connecting...",
            Self::Resolving => "Entering room...",
            Self::Joined => "Connected",
            Self::Disconnected => "Disconnected",
            Self::Failed => "Could not enter room",
        }
    }
}

/// Read-only snapshot handed to the chat view.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChatState {
    pub nickname: String,
    pub room_id: Option<String>,
    pub status: SessionStatus,
    pub messages: Vec<ChatMessage>,
    pub error: Option<String>,
}

impl ChatState {
    /// Whether `msg` was written under the current nickname.
    pub fn is_own(&self, msg: &ChatMessage) -> bool {
        !msg.is_system_message && msg.sender_nickname == self.nickname
    }

    pub fn can_send(&self) -> bool {
        self.status == SessionStatus::Joined
    }
}
