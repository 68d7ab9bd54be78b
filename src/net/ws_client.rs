//! WebSocket binding of the realtime messaging service.
//!
//! Requests and pushes share one JSON envelope, `{ type, data, callbackId }`.
//! Room requests carry a fresh `callbackId`; the reply echoes it and resolves
//! the waiting request. Everything else is a push for `on_message`.
//!
//! The socket loop is gated behind `#[cfg(feature = "hydrate")]` since it
//! requires a browser. Envelope handling and reply routing are plain code and
//! are exercised natively.
//!
//! ERROR HANDLING
//! ==============
//! Undecodable frames are logged and dropped. When the socket ends, every
//! outstanding request fails with `TransportError::Closed` before `on_closed`
//! fires.

#[cfg(test)]
#[path = "ws_client_test.rs"]
mod ws_client_test;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use futures::channel::oneshot;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::net::parse::pick_str;
use crate::net::types::{InboundEvent, MessageKind};

const ERROR_KEYS: &[&str] = &["error", "errorMessage"];

/// One frame on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_id: Option<String>,
}

/// Serialize an outgoing frame.
pub fn encode_request(
    kind: MessageKind,
    data: serde_json::Value,
    callback_id: Option<&str>,
) -> Result<String, TransportError> {
    let envelope = WireEnvelope {
        kind: kind.as_str().to_owned(),
        data,
        callback_id: callback_id.map(str::to_owned),
    };
    serde_json::to_string(&envelope).map_err(|e| TransportError::Protocol(e.to_string()))
}

/// Parse an incoming text frame.
pub fn decode_envelope(raw: &str) -> Result<WireEnvelope, TransportError> {
    serde_json::from_str(raw).map_err(|e| TransportError::Protocol(format!("bad frame: {e}")))
}

/// Interpret a reply: an `error` field means the request was rejected.
pub fn reply_result(envelope: &WireEnvelope) -> Result<serde_json::Value, TransportError> {
    if let Some(reason) = pick_str(&envelope.data, ERROR_KEYS) {
        return Err(TransportError::Rejected(reason.to_owned()));
    }
    Ok(envelope.data.clone())
}

type ReplySender = oneshot::Sender<Result<serde_json::Value, TransportError>>;

/// Requests waiting for a correlated reply.
#[derive(Default)]
pub struct PendingReplies {
    next_id: Cell<u64>,
    waiting: RefCell<HashMap<String, ReplySender>>,
}

impl PendingReplies {
    /// Allocate a callback id and register a waiter for it.
    pub fn register(&self) -> (String, oneshot::Receiver<Result<serde_json::Value, TransportError>>) {
        let n = self.next_id.get() + 1;
        self.next_id.set(n);
        let id = format!("cb-{n}");
        let (tx, rx) = oneshot::channel();
        self.waiting.borrow_mut().insert(id.clone(), tx);
        (id, rx)
    }

    pub fn cancel(&self, callback_id: &str) {
        self.waiting.borrow_mut().remove(callback_id);
    }

    pub fn len(&self) -> usize {
        self.waiting.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.borrow().is_empty()
    }

    /// Resolve the waiter this envelope answers, or hand the envelope back
    /// as a push.
    pub fn route(&self, envelope: WireEnvelope) -> Option<InboundEvent> {
        if let Some(id) = envelope.callback_id.as_deref() {
            let waiter = self.waiting.borrow_mut().remove(id);
            if let Some(waiter) = waiter {
                let _ = waiter.send(reply_result(&envelope));
                return None;
            }
        }
        Some(InboundEvent::from_wire(&envelope.kind, envelope.data))
    }

    /// Fail every outstanding request.
    pub fn fail_all(&self) {
        let waiting = std::mem::take(&mut *self.waiting.borrow_mut());
        for (_, waiter) in waiting {
            let _ = waiter.send(Err(TransportError::Closed));
        }
    }
}

/// Shared exit for the socket loop. Waiters fail before `on_closed` runs.
pub fn finish_socket(closed: &Cell<bool>, pending: &PendingReplies, on_closed: &dyn Fn()) {
    closed.set(true);
    pending.fail_all();
    on_closed();
}

#[cfg(feature = "hydrate")]
pub use self::browser::WsConnector;

#[cfg(feature = "hydrate")]
mod browser {
    use std::cell::Cell;
    use std::rc::Rc;

    use futures::channel::mpsc;
    use serde_json::json;

    use super::{PendingReplies, decode_envelope, encode_request, finish_socket};
    use crate::error::TransportError;
    use crate::net::parse::{parse_history, parse_room_id};
    use crate::net::transport::{ConnectionHandlers, Connector, RequestFuture, Transport};
    use crate::net::types::{JoinReply, MessageKind};
    use crate::util::clock::now_millis;

    /// Opens one websocket per session.
    pub struct WsConnector {
        url: String,
    }

    impl WsConnector {
        pub fn new(url: impl Into<String>) -> Self {
            Self { url: url.into() }
        }
    }

    impl Connector for WsConnector {
        fn connect(&self, handlers: ConnectionHandlers) -> Rc<dyn Transport> {
            let (tx, rx) = mpsc::unbounded::<String>();
            let pending = Rc::new(PendingReplies::default());
            let closed = Rc::new(Cell::new(false));
            leptos::task::spawn_local(run_socket(
                self.url.clone(),
                handlers,
                rx,
                Rc::clone(&pending),
                Rc::clone(&closed),
            ));
            Rc::new(WsTransport { tx, pending, closed })
        }
    }

    struct WsTransport {
        tx: mpsc::UnboundedSender<String>,
        pending: Rc<PendingReplies>,
        closed: Rc<Cell<bool>>,
    }

    impl WsTransport {
        fn request(&self, kind: MessageKind, data: serde_json::Value) -> RequestFuture<'_, serde_json::Value> {
            if self.closed.get() {
                return Box::pin(async { Err(TransportError::Closed) });
            }
            let (callback_id, rx) = self.pending.register();
            let queued = encode_request(kind, data, Some(&callback_id)).and_then(|frame| {
                self.tx
                    .unbounded_send(frame)
                    .map_err(|_| TransportError::Closed)
            });
            if let Err(e) = queued {
                self.pending.cancel(&callback_id);
                return Box::pin(async move { Err(e) });
            }
            Box::pin(async move { rx.await.unwrap_or(Err(TransportError::Closed)) })
        }
    }

    impl Transport for WsTransport {
        fn create_room(&self, nickname: &str, avatar: &str) -> RequestFuture<'_, String> {
            let reply = self.request(
                MessageKind::CreateSession,
                json!({ "nickname": nickname, "userIcon": avatar }),
            );
            Box::pin(async move {
                let data = reply.await?;
                parse_room_id(&data).ok_or_else(|| TransportError::Protocol(format!("no room id in reply: {data}")))
            })
        }

        fn join_room(&self, nickname: &str, room_id: &str, avatar: &str) -> RequestFuture<'_, JoinReply> {
            let reply = self.request(
                MessageKind::JoinSession,
                json!({ "sessionId": room_id, "nickname": nickname, "userIcon": avatar }),
            );
            Box::pin(async move {
                let data = reply.await?;
                Ok(JoinReply { messages: parse_history(&data, now_millis()) })
            })
        }

        fn send(&self, kind: MessageKind, payload: serde_json::Value) -> Result<(), TransportError> {
            if self.closed.get() {
                return Err(TransportError::Closed);
            }
            let frame = encode_request(kind, payload, None)?;
            self.tx
                .unbounded_send(frame)
                .map_err(|_| TransportError::Closed)
        }

        fn teardown(&self) {
            if self.closed.replace(true) {
                return;
            }
            self.tx.close_channel();
            self.pending.fail_all();
        }
    }

    /// Drive one socket until either side ends.
    async fn run_socket(
        url: String,
        handlers: ConnectionHandlers,
        mut rx: mpsc::UnboundedReceiver<String>,
        pending: Rc<PendingReplies>,
        closed: Rc<Cell<bool>>,
    ) {
        use futures::{SinkExt, StreamExt};
        use gloo_net::websocket::Message;
        use gloo_net::websocket::futures::WebSocket;

        let ws = match WebSocket::open(&url) {
            Ok(ws) => ws,
            Err(e) => {
                log::warn!("websocket open failed for {url}: {e}");
                finish_socket(&closed, &pending, &*handlers.on_closed);
                return;
            }
        };
        let (mut ws_write, mut ws_read) = ws.split();

        // The sink only reports ready once the handshake completes.
        let ready = futures::future::poll_fn(|cx| ws_write.poll_ready_unpin(cx)).await;
        if let Err(e) = ready {
            log::warn!("websocket handshake failed for {url}: {e}");
            finish_socket(&closed, &pending, &*handlers.on_closed);
            return;
        }
        if !closed.get() {
            (handlers.on_ready)();
        }

        let send_task = async {
            while let Some(frame) = rx.next().await {
                if ws_write.send(Message::Text(frame)).await.is_err() {
                    break;
                }
            }
        };

        let recv_task = async {
            while let Some(msg) = ws_read.next().await {
                match msg {
                    Ok(Message::Text(text)) => match decode_envelope(&text) {
                        Ok(envelope) => {
                            if let Some(event) = pending.route(envelope) {
                                (handlers.on_message)(event);
                            }
                        }
                        Err(e) => log::warn!("dropping frame: {e}"),
                    },
                    Ok(Message::Bytes(_)) => {}
                    Err(e) => {
                        log::warn!("websocket recv error: {e}");
                        break;
                    }
                }
            }
        };

        futures::future::select(Box::pin(send_task), Box::pin(recv_task)).await;

        finish_socket(&closed, &pending, &*handlers.on_closed);
        log::info!("websocket to {url} finished");
    }
}
