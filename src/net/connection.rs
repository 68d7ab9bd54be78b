//! Connection manager: one realtime connection with an awaitable ready gate.
//!
//! SYSTEM CONTEXT
//! ==============
//! Room requests must not go out before the service reports readiness. The
//! gate below turns the `on_ready` callback into a suspension point, so the
//! room controller waits on the event itself rather than on a timer.
//!
//! Once `close` runs, every later transport callback is dropped here before
//! it can reach session state.

#[cfg(test)]
#[path = "connection_test.rs"]
mod connection_test;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::channel::oneshot;

use crate::error::{ChatError, TransportError};
use crate::net::transport::{ConnectionHandlers, Connector, Transport};
use crate::net::types::{JoinReply, MessageKind};

/// Observable link state of a [`Connection`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkStatus {
    Pending,
    Ready,
    Closed,
}

struct LinkState {
    status: Cell<LinkStatus>,
    disposed: Cell<bool>,
    waiters: RefCell<Vec<oneshot::Sender<Result<(), ChatError>>>>,
}

impl LinkState {
    fn new() -> Self {
        Self {
            status: Cell::new(LinkStatus::Pending),
            disposed: Cell::new(false),
            waiters: RefCell::new(Vec::new()),
        }
    }

    fn settle(&self, status: LinkStatus) {
        self.status.set(status);
        let result = match status {
            LinkStatus::Ready => Ok(()),
            LinkStatus::Closed => Err(ChatError::Connection("connection closed before it became ready".to_owned())),
            LinkStatus::Pending => return,
        };
        let waiters = std::mem::take(&mut *self.waiters.borrow_mut());
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
    }
}

/// Opens [`Connection`]s through a [`Connector`].
#[derive(Clone)]
pub struct ConnectionManager {
    connector: Rc<dyn Connector>,
}

impl ConnectionManager {
    pub fn new(connector: Rc<dyn Connector>) -> Self {
        Self { connector }
    }

    /// Establish one connection and register `handlers` on it.
    ///
    /// The returned handle gates the handlers: after [`Connection::close`]
    /// none of them fire again.
    pub fn open(&self, handlers: ConnectionHandlers) -> Connection {
        let link = Rc::new(LinkState::new());
        let ConnectionHandlers { on_ready, on_closed, on_message } = handlers;

        let ready_link = Rc::clone(&link);
        let closed_link = Rc::clone(&link);
        let message_link = Rc::clone(&link);
        let gated = ConnectionHandlers {
            on_ready: Box::new(move || {
                if ready_link.disposed.get() || ready_link.status.get() != LinkStatus::Pending {
                    return;
                }
                log::info!("realtime connection ready");
                ready_link.settle(LinkStatus::Ready);
                on_ready();
            }),
            on_closed: Box::new(move || {
                if closed_link.disposed.get() || closed_link.status.get() == LinkStatus::Closed {
                    return;
                }
                log::warn!("realtime connection closed");
                closed_link.settle(LinkStatus::Closed);
                on_closed();
            }),
            on_message: Box::new(move |event| {
                if message_link.disposed.get() || message_link.status.get() == LinkStatus::Closed {
                    log::debug!("dropping late inbound event type={}", event.kind());
                    return;
                }
                on_message(event);
            }),
        };

        let transport = self.connector.connect(gated);
        Connection { transport, link }
    }
}

/// Handle to one live connection.
#[derive(Clone)]
pub struct Connection {
    transport: Rc<dyn Transport>,
    link: Rc<LinkState>,
}

impl Connection {
    pub fn status(&self) -> LinkStatus {
        self.link.status.get()
    }

    pub fn is_ready(&self) -> bool {
        self.status() == LinkStatus::Ready
    }

    /// Suspend until the service reports readiness.
    ///
    /// Fails if the connection closes first or was already closed.
    pub async fn ready(&self) -> Result<(), ChatError> {
        let rx = match self.link.status.get() {
            LinkStatus::Ready => return Ok(()),
            LinkStatus::Closed => {
                return Err(ChatError::Connection("connection is closed".to_owned()));
            }
            LinkStatus::Pending => {
                let (tx, rx) = oneshot::channel();
                self.link.waiters.borrow_mut().push(tx);
                rx
            }
        };
        rx.await
            .unwrap_or_else(|_| Err(ChatError::Connection("connection dropped".to_owned())))
    }

    pub async fn create_room(&self, nickname: &str, avatar: &str) -> Result<String, TransportError> {
        self.ensure_ready()?;
        self.transport.create_room(nickname, avatar).await
    }

    pub async fn join_room(&self, nickname: &str, room_id: &str, avatar: &str) -> Result<JoinReply, TransportError> {
        self.ensure_ready()?;
        self.transport.join_room(nickname, room_id, avatar).await
    }

    pub fn send(&self, kind: MessageKind, payload: serde_json::Value) -> Result<(), TransportError> {
        self.ensure_ready()?;
        self.transport.send(kind, payload)
    }

    /// Release the connection. Safe before ready and safe to repeat.
    pub fn close(&self) {
        if self.link.disposed.replace(true) {
            return;
        }
        self.link.settle(LinkStatus::Closed);
        self.transport.teardown();
    }

    fn ensure_ready(&self) -> Result<(), TransportError> {
        if self.link.disposed.get() || self.link.status.get() != LinkStatus::Ready {
            return Err(TransportError::Closed);
        }
        Ok(())
    }
}
