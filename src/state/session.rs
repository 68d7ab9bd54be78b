//! Chat session: one connection, one room, one nickname, one reconciled log.
//!
//! SYSTEM CONTEXT
//! ==============
//! `ChatSession` drives the room controller over a `Connection` and feeds the
//! reconciler from history replays, live pushes and local sends. After each
//! mutation it persists the log and publishes a `ChatState` to its listener.
//!
//! DISPOSAL
//! ========
//! `dispose` flushes the log, seals it and closes the connection in one
//! synchronous step. Transport callbacks are gated by the connection and by a
//! disposed flag here, and `activate` re-checks liveness after every await, so
//! nothing that lands late can mutate a discarded session.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::config::{ChatConfig, DEFAULT_NICKNAME};
use crate::error::{ChatError, TransportError};
use crate::net::connection::{Connection, ConnectionManager};
use crate::net::transport::ConnectionHandlers;
use crate::net::types::{ChatMessage, InboundEvent, MessageKind, SendMessageData};
use crate::state::chat::{ChatState, SessionStatus};
use crate::state::reconciler::{Applied, MessageReconciler, PresenceFilter};
use crate::state::room::{RoomController, RoomPlan, RoomSource, plan_room};
use crate::state::store::SessionStore;
use crate::util::clock::now_millis;

type Listener = Rc<dyn Fn(&ChatState)>;

/// Navigation parameters a session starts from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionParams {
    pub nickname: String,
    /// Absent means "rejoin the cached room, or create one".
    pub room_id: Option<String>,
}

impl SessionParams {
    /// Normalise raw query values: blank nickname becomes `Anonymous`,
    /// blank room id becomes absent.
    pub fn from_query(nickname: Option<&str>, room_id: Option<&str>) -> Self {
        let nickname = nickname
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_NICKNAME)
            .to_owned();
        let room_id = room_id
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_owned);
        Self { nickname, room_id }
    }
}

struct SessionCore {
    nickname: String,
    room: RoomController,
    reconciler: MessageReconciler,
    error: Option<ChatError>,
    disposed: bool,
}

impl SessionCore {
    fn view(&self) -> ChatState {
        ChatState {
            nickname: self.nickname.clone(),
            room_id: self.room.room_id().map(str::to_owned),
            status: SessionStatus::from_phase(self.room.phase()),
            messages: self.reconciler.snapshot(),
            error: self.error.as_ref().map(ToString::to_string),
        }
    }

    fn is_live(&self) -> bool {
        !self.disposed && !self.room.is_finished()
    }

    fn persist(&self, store: &SessionStore) {
        let Some(room_id) = self.room.room_id() else {
            return;
        };
        if let Err(e) = self.reconciler.persist(store, room_id) {
            log::warn!("could not cache log for room {room_id}: {e}");
        }
    }

    fn apply_inbound(&mut self, event: &InboundEvent, store: &SessionStore) -> bool {
        if self.disposed {
            return false;
        }
        match self.reconciler.append_inbound(event, now_millis()) {
            Applied::Appended => {
                self.persist(store);
                true
            }
            Applied::Duplicate | Applied::Filtered | Applied::Ignored | Applied::Sealed => false,
        }
    }

    fn connection_lost(&mut self, store: &SessionStore) -> bool {
        if !self.is_live() {
            return false;
        }
        self.persist(store);
        self.error = Some(ChatError::Connection("the chat service closed the connection".to_owned()));
        self.room.close();
        true
    }

    fn record_failure(&mut self, err: ChatError) {
        if self.disposed {
            return;
        }
        if self.error.is_none() {
            self.error = Some(err.clone());
        }
        self.room.fail(err);
    }
}

fn publish(core: &RefCell<SessionCore>, listener: &RefCell<Option<Listener>>) {
    let Some(listener) = listener.borrow().clone() else {
        return;
    };
    let view = {
        let core = core.borrow();
        if core.disposed {
            return;
        }
        core.view()
    };
    listener(&view);
}

/// One live chat session.
pub struct ChatSession {
    core: Rc<RefCell<SessionCore>>,
    listener: Rc<RefCell<Option<Listener>>>,
    connection: Connection,
    store: SessionStore,
    params: SessionParams,
    avatar: String,
    cached_room: Option<String>,
}

impl ChatSession {
    /// Open the connection and seed the log from cache. Room requests wait
    /// for [`ChatSession::activate`].
    pub fn open(
        params: SessionParams,
        manager: &ConnectionManager,
        store: SessionStore,
        config: &ChatConfig,
    ) -> Result<Self, ChatError> {
        let presence = PresenceFilter::new(&config.presence_pattern)?;
        let cached_room = store.last_room_id();

        let mut reconciler = MessageReconciler::new(presence);
        if let RoomPlan::Join { room_id, .. } = plan_room(params.room_id.as_deref(), cached_room.as_deref()) {
            reconciler.seed(store.load_log_or_empty(&room_id));
        }
        let mut room = RoomController::new(params.room_id.clone());
        room.begin_connecting();

        let core = Rc::new(RefCell::new(SessionCore {
            nickname: params.nickname.clone(),
            room,
            reconciler,
            error: None,
            disposed: false,
        }));
        let listener: Rc<RefCell<Option<Listener>>> = Rc::new(RefCell::new(None));

        let handlers = ConnectionHandlers {
            on_ready: Box::new(|| log::debug!("chat session connection ready")),
            on_closed: Box::new(closed_handler(Rc::downgrade(&core), Rc::downgrade(&listener), store.clone())),
            on_message: Box::new(message_handler(Rc::downgrade(&core), Rc::downgrade(&listener), store.clone())),
        };
        let connection = manager.open(handlers);

        log::info!(
            "opened chat session nickname={} room={:?}",
            params.nickname,
            params.room_id
        );
        Ok(Self { core, listener, connection, store, params, avatar: config.avatar.clone(), cached_room })
    }

    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    /// Register the view listener and publish the current state to it.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&ChatState) + 'static,
    {
        *self.listener.borrow_mut() = Some(Rc::new(listener));
        self.publish();
    }

    /// Wait for readiness, resolve the room, join it and merge its history.
    ///
    /// Returns the canonical room id. Failures are recorded on the session
    /// and never retried.
    pub async fn activate(&self) -> Result<String, ChatError> {
        let result = self.resolve_and_join().await;
        if let Err(err) = &result {
            log::warn!("chat session activation failed: {err}");
            let live = self.core.borrow().is_live();
            if live {
                self.core.borrow_mut().record_failure(err.clone());
                self.connection.close();
            }
        }
        self.publish();
        result
    }

    async fn resolve_and_join(&self) -> Result<String, ChatError> {
        self.connection.ready().await?;
        self.ensure_live()?;

        let plan = self
            .core
            .borrow_mut()
            .room
            .on_ready(self.cached_room.as_deref())
            .ok_or_else(|| ChatError::Connection("session is not waiting for a connection".to_owned()))?;
        self.publish();

        let (room_id, source) = match plan {
            RoomPlan::Join { room_id, source } => (room_id, source),
            RoomPlan::Create => {
                let room_id = self
                    .connection
                    .create_room(&self.params.nickname, &self.avatar)
                    .await
                    .map_err(TransportError::into_room_error)?;
                self.ensure_live()?;
                log::info!("created room {room_id}");
                (room_id, RoomSource::Created)
            }
        };

        let bound = self.core.borrow_mut().room.bind(room_id.clone(), source);
        if !bound {
            return Err(ChatError::RoomResolution(format!("session already bound; refusing room {room_id}")));
        }
        let reply = match self.connection.join_room(&self.params.nickname, &room_id, &self.avatar).await {
            Ok(reply) => reply,
            Err(err) => {
                if source == RoomSource::Cached {
                    if let Err(e) = self.store.forget_last_room_id() {
                        log::warn!("could not forget stale room {room_id}: {e}");
                    }
                }
                return Err(err.into_room_error());
            }
        };
        self.ensure_live()?;

        if let Err(e) = self.store.set_last_room_id(&room_id) {
            log::warn!("could not remember room {room_id}: {e}");
        }
        {
            let mut core = self.core.borrow_mut();
            let added = core.reconciler.merge_history(&reply.messages);
            core.room.on_joined();
            core.persist(&self.store);
            log::info!("joined room {room_id}: {added} new of {} history entries", reply.messages.len());
        }
        Ok(room_id)
    }

    /// Echo `text` locally, then send it.
    ///
    /// Blank text is ignored and yields `Ok(None)`.
    pub fn send_text(&self, text: &str) -> Result<Option<ChatMessage>, ChatError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let msg = {
            let mut core = self.core.borrow_mut();
            if core.disposed || !core.room.is_joined() {
                return Err(ChatError::Connection("not connected to a room".to_owned()));
            }
            let Some(msg) = core
                .reconciler
                .append_local(text, &self.params.nickname, &self.avatar, now_millis())
            else {
                return Err(ChatError::Connection("session is closed".to_owned()));
            };
            core.persist(&self.store);
            msg
        };
        self.publish();

        let payload = serde_json::to_value(SendMessageData::from_local(&msg))
            .map_err(|e| ChatError::Connection(format!("could not encode message: {e}")))?;
        self.connection
            .send(MessageKind::SendMessage, payload)
            .map_err(|e| ChatError::Connection(e.to_string()))?;
        Ok(Some(msg))
    }

    /// Current reconciled log.
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.core.borrow().reconciler.snapshot()
    }

    /// Current view state.
    pub fn state(&self) -> ChatState {
        self.core.borrow().view()
    }

    pub fn is_disposed(&self) -> bool {
        self.core.borrow().disposed
    }

    /// Flush, seal and close. Safe to call more than once.
    pub fn dispose(&self) {
        {
            let mut core = self.core.borrow_mut();
            if core.disposed {
                return;
            }
            core.persist(&self.store);
            core.disposed = true;
            core.reconciler.seal();
            core.room.close();
        }
        self.connection.close();
        log::info!("chat session for {} disposed", self.params.nickname);
    }

    fn ensure_live(&self) -> Result<(), ChatError> {
        if self.core.borrow().is_live() {
            Ok(())
        } else {
            Err(ChatError::Connection("session closed".to_owned()))
        }
    }

    fn publish(&self) {
        publish(&self.core, &self.listener);
    }
}

fn closed_handler(
    core: Weak<RefCell<SessionCore>>,
    listener: Weak<RefCell<Option<Listener>>>,
    store: SessionStore,
) -> impl Fn() + 'static {
    move || {
        let (Some(core), Some(listener)) = (core.upgrade(), listener.upgrade()) else {
            return;
        };
        let changed = core.borrow_mut().connection_lost(&store);
        if changed {
            publish(&core, &listener);
        }
    }
}

fn message_handler(
    core: Weak<RefCell<SessionCore>>,
    listener: Weak<RefCell<Option<Listener>>>,
    store: SessionStore,
) -> impl Fn(InboundEvent) + 'static {
    move |event| {
        let (Some(core), Some(listener)) = (core.upgrade(), listener.upgrade()) else {
            return;
        };
        let changed = core.borrow_mut().apply_inbound(&event, &store);
        if changed {
            publish(&core, &listener);
        }
    }
}

/// Keeps exactly one live session per chat view.
#[derive(Default)]
pub struct SessionHost {
    current: Option<Rc<ChatSession>>,
}

impl SessionHost {
    pub fn current(&self) -> Option<Rc<ChatSession>> {
        self.current.clone()
    }

    /// Make `params` the live session.
    ///
    /// Returns `Ok(None)` when the live session already matches. Otherwise
    /// the old session is disposed before `open` runs.
    pub fn switch<F>(&mut self, params: SessionParams, open: F) -> Result<Option<Rc<ChatSession>>, ChatError>
    where
        F: FnOnce(SessionParams) -> Result<ChatSession, ChatError>,
    {
        if let Some(current) = &self.current {
            if current.params() == &params && !current.is_disposed() {
                return Ok(None);
            }
        }
        self.dispose();
        let session = Rc::new(open(params)?);
        self.current = Some(Rc::clone(&session));
        Ok(Some(session))
    }

    pub fn dispose(&mut self) {
        if let Some(session) = self.current.take() {
            session.dispose();
        }
    }
}
