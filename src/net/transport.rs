//! Contract with the external realtime messaging service.
//!
//! The session core only talks to these traits. The websocket binding lives
//! in `ws_client`; tests script their own implementation.

use std::rc::Rc;

use futures::future::LocalBoxFuture;

use crate::error::TransportError;
use crate::net::types::{InboundEvent, JoinReply, MessageKind};

/// Future returned by a room request.
pub type RequestFuture<'a, T> = LocalBoxFuture<'a, Result<T, TransportError>>;

/// One live connection to the realtime service.
pub trait Transport {
    /// Ask the service for a new room; resolves to its id.
    fn create_room(&self, nickname: &str, avatar: &str) -> RequestFuture<'_, String>;

    /// Join `room_id`; resolves to the room's history replay.
    fn join_room(&self, nickname: &str, room_id: &str, avatar: &str) -> RequestFuture<'_, JoinReply>;

    /// Fire-and-forget push to the room.
    fn send(&self, kind: MessageKind, payload: serde_json::Value) -> Result<(), TransportError>;

    /// Release the socket and fail any outstanding request. Must be idempotent.
    fn teardown(&self);
}

/// Opens transports. The handlers are registered before any I/O starts.
pub trait Connector {
    fn connect(&self, handlers: ConnectionHandlers) -> Rc<dyn Transport>;
}

/// Lifecycle callbacks for one connection.
pub struct ConnectionHandlers {
    /// The connection can carry room requests.
    pub on_ready: Box<dyn Fn()>,
    /// The connection terminated, expected or not.
    pub on_closed: Box<dyn Fn()>,
    /// Asynchronous push from the server.
    pub on_message: Box<dyn Fn(InboundEvent)>,
}

impl Default for ConnectionHandlers {
    fn default() -> Self {
        Self {
            on_ready: Box::new(|| {}),
            on_closed: Box::new(|| {}),
            on_message: Box::new(|_| {}),
        }
    }
}
