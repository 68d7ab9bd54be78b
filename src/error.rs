//! Error taxonomy for the chat session core.
//!
//! ERROR HANDLING
//! ==============
//! No error here is fatal to the page. Every variant is scoped to the current
//! session and ends up as renderable state on `ChatState`.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

/// Session-level failure surfaced to the chat view.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    /// The transport is unreachable or closed underneath an active session.
    #[error("connection lost: {0}")]
    Connection(String),
    /// Room creation or join was rejected.
    #[error("could not enter room: {0}")]
    RoomResolution(String),
    /// An inbound payload was unusable and had to be dropped.
    #[error("malformed inbound event: {0}")]
    MalformedEvent(String),
    /// Local storage read/write failed or held corrupt data.
    #[error("local cache unavailable: {0}")]
    Cache(String),
    /// A configuration value could not be used.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ChatError {
    /// Whether this error ends the current session attempt.
    ///
    /// Malformed events and cache failures are recovered locally.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::RoomResolution(_) | Self::Config(_))
    }
}

/// Failure reported by a [`crate::net::transport::Transport`] implementation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The connection is closed or was never established.
    #[error("connection closed")]
    Closed,
    /// The server answered the request with an error.
    #[error("request rejected: {0}")]
    Rejected(String),
    /// The server reply could not be interpreted.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    /// Map a failed room request into the session taxonomy.
    ///
    /// A closed connection stays a connectivity problem; anything the server
    /// actually answered is a room resolution failure.
    #[must_use]
    pub fn into_room_error(self) -> ChatError {
        match self {
            Self::Closed => ChatError::Connection(self.to_string()),
            Self::Rejected(reason) | Self::Protocol(reason) => ChatError::RoomResolution(reason),
        }
    }
}

/// Failure reported by a key-value storage backend.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No storage is available in this environment.
    #[error("storage unavailable")]
    Unavailable,
    /// The backend refused a read or write (quota, privacy mode).
    #[error("storage access failed: {0}")]
    Access(String),
    /// A stored value could not be decoded.
    #[error("corrupt cached value under {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

impl From<StoreError> for ChatError {
    fn from(err: StoreError) -> Self {
        Self::Cache(err.to_string())
    }
}
