//! In-memory realtime service used by unit tests.
//!
//! Records every request, answers room requests from canned results, and lets
//! a test fire lifecycle callbacks by hand.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::TransportError;
use crate::net::transport::{ConnectionHandlers, Connector, RequestFuture, Transport};
use crate::net::types::{ChatMessage, InboundEvent, JoinReply, MessageKind};

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Call {
    Create { nickname: String, avatar: String },
    Join { nickname: String, room_id: String, avatar: String },
    Send { kind: MessageKind, payload: serde_json::Value },
}

struct Inner {
    handlers: RefCell<Vec<ConnectionHandlers>>,
    calls: RefCell<Vec<Call>>,
    create_result: RefCell<Result<String, TransportError>>,
    join_result: RefCell<Result<JoinReply, TransportError>>,
    ready_on_connect: Cell<bool>,
    teardowns: Cell<usize>,
}

#[derive(Clone)]
pub(crate) struct ScriptedService {
    inner: Rc<Inner>,
}

impl ScriptedService {
    pub(crate) fn new() -> Self {
        Self {
            inner: Rc::new(Inner {
                handlers: RefCell::new(Vec::new()),
                calls: RefCell::new(Vec::new()),
                create_result: RefCell::new(Ok("R1".to_owned())),
                join_result: RefCell::new(Ok(JoinReply::default())),
                ready_on_connect: Cell::new(false),
                teardowns: Cell::new(0),
            }),
        }
    }

    /// Fire `on_ready` synchronously inside `connect`.
    pub(crate) fn ready_immediately(self) -> Self {
        self.inner.ready_on_connect.set(true);
        self
    }

    pub(crate) fn connector(&self) -> Rc<dyn Connector> {
        Rc::new(self.clone())
    }

    pub(crate) fn set_create_result(&self, result: Result<String, TransportError>) {
        *self.inner.create_result.borrow_mut() = result;
    }

    pub(crate) fn set_history(&self, messages: Vec<ChatMessage>) {
        *self.inner.join_result.borrow_mut() = Ok(JoinReply { messages });
    }

    pub(crate) fn set_join_result(&self, result: Result<JoinReply, TransportError>) {
        *self.inner.join_result.borrow_mut() = result;
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.inner.calls.borrow().clone()
    }

    pub(crate) fn connections(&self) -> usize {
        self.inner.handlers.borrow().len()
    }

    pub(crate) fn teardowns(&self) -> usize {
        self.inner.teardowns.get()
    }

    pub(crate) fn fire_ready(&self) {
        self.fire_on(self.latest(), |h| (h.on_ready)());
    }

    pub(crate) fn fire_closed(&self) {
        self.fire_on(self.latest(), |h| (h.on_closed)());
    }

    pub(crate) fn fire_message(&self, event: InboundEvent) {
        self.fire_message_on(self.latest(), event);
    }

    pub(crate) fn fire_message_on(&self, connection: usize, event: InboundEvent) {
        self.fire_on(connection, move |h| (h.on_message)(event));
    }

    fn latest(&self) -> usize {
        self.connections().saturating_sub(1)
    }

    fn fire_on<F: FnOnce(&ConnectionHandlers)>(&self, connection: usize, f: F) {
        let handlers = self.inner.handlers.borrow();
        if let Some(h) = handlers.get(connection) {
            f(h);
        }
    }
}

impl Connector for ScriptedService {
    fn connect(&self, handlers: ConnectionHandlers) -> Rc<dyn Transport> {
        let ready_now = self.inner.ready_on_connect.get();
        if ready_now {
            (handlers.on_ready)();
        }
        self.inner.handlers.borrow_mut().push(handlers);
        Rc::new(self.clone())
    }
}

impl Transport for ScriptedService {
    fn create_room(&self, nickname: &str, avatar: &str) -> RequestFuture<'_, String> {
        self.inner.calls.borrow_mut().push(Call::Create {
            nickname: nickname.to_owned(),
            avatar: avatar.to_owned(),
        });
        let result = self.inner.create_result.borrow().clone();
        Box::pin(async move { result })
    }

    fn join_room(&self, nickname: &str, room_id: &str, avatar: &str) -> RequestFuture<'_, JoinReply> {
        self.inner.calls.borrow_mut().push(Call::Join {
            nickname: nickname.to_owned(),
            room_id: room_id.to_owned(),
            avatar: avatar.to_owned(),
        });
        let result = self.inner.join_result.borrow().clone();
        Box::pin(async move { result })
    }

    fn send(&self, kind: MessageKind, payload: serde_json::Value) -> Result<(), TransportError> {
        self.inner.calls.borrow_mut().push(Call::Send { kind, payload });
        Ok(())
    }

    fn teardown(&self) {
        self.inner.teardowns.set(self.inner.teardowns.get() + 1);
    }
}

pub(crate) fn message(id: &str, sender: &str, body: &str) -> ChatMessage {
    ChatMessage {
        id: id.to_owned(),
        is_system_message: false,
        sender_nickname: sender.to_owned(),
        sender_icon: String::new(),
        body: body.to_owned(),
        timestamp: 1_000,
    }
}

pub(crate) fn system_message(id: &str, body: &str) -> ChatMessage {
    ChatMessage {
        is_system_message: true,
        ..message(id, "", body)
    }
}
