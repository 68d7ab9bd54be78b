//! Message reconciler: one ordered, de-duplicated log per room session.
//!
//! DESIGN
//! ======
//! Three sources feed the log: the cached log (`seed`), the server's history
//! replay on join (`merge_history`), and live traffic (`append_inbound` for
//! pushes, `append_local` for the user's own sends). Entries keep arrival
//! order; timestamps are never used to reorder.
//!
//! Own messages are echoed locally before the send goes out. An inbound push
//! that repeats one of them is suppressed, first by id and otherwise by the
//! oldest pending echo with the same sender and body. Inbound traffic is
//! never waited on for display.
//!
//! Content matching only covers the pushes immediately following a send: the
//! first inbound message that is not an echo drops every pending echo. After
//! that only the local id dedups, so another user with the same nickname and
//! text is never swallowed.
//!
//! After `seal`, every mutation is a no-op so late callbacks cannot touch a
//! discarded log.

#[cfg(test)]
#[path = "reconciler_test.rs"]
mod reconciler_test;

use std::collections::{HashSet, VecDeque};

use regex::Regex;
use uuid::Uuid;

use crate::error::ChatError;
use crate::net::parse::parse_chat_message;
use crate::net::types::{ChatMessage, InboundEvent};
use crate::state::store::SessionStore;

/// Drops server-injected join/leave notifications.
#[derive(Clone, Debug)]
pub struct PresenceFilter {
    pattern: Regex,
}

impl PresenceFilter {
    pub fn new(pattern: &str) -> Result<Self, ChatError> {
        let pattern = Regex::new(pattern).map_err(|e| ChatError::Config(format!("presence pattern: {e}")))?;
        Ok(Self { pattern })
    }

    /// System message whose body reads like a join/leave notice.
    pub fn is_noise(&self, msg: &ChatMessage) -> bool {
        msg.is_system_message && self.pattern.is_match(&msg.body)
    }
}

impl Default for PresenceFilter {
    fn default() -> Self {
        Self { pattern: Regex::new(crate::config::DEFAULT_PRESENCE_PATTERN).expect("default presence pattern is valid") }
    }
}

/// What happened to one candidate entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Applied {
    Appended,
    /// Same id already present, or the echo of a local send.
    Duplicate,
    /// Presence noise.
    Filtered,
    /// Not a chat message, or unusable payload.
    Ignored,
    /// The log was sealed.
    Sealed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct PendingEcho {
    id: String,
    sender: String,
    body: String,
}

#[derive(Clone, Debug, Default)]
pub struct MessageReconciler {
    log: Vec<ChatMessage>,
    ids: HashSet<String>,
    pending_echoes: VecDeque<PendingEcho>,
    presence: PresenceFilter,
    seeded: bool,
    sealed: bool,
}

impl MessageReconciler {
    pub fn new(presence: PresenceFilter) -> Self {
        Self { presence, ..Self::default() }
    }

    /// Initialise from a cached log. Only the first call has an effect.
    pub fn seed(&mut self, cached: Vec<ChatMessage>) {
        if self.sealed || self.seeded {
            return;
        }
        self.seeded = true;
        let mut appended = 0_usize;
        for msg in cached {
            if self.push_unique(msg) == Applied::Appended {
                appended += 1;
            }
        }
        log::debug!("seeded {appended} cached messages");
    }

    /// Append a server history replay; returns how many entries were new.
    pub fn merge_history(&mut self, replay: &[ChatMessage]) -> usize {
        if self.sealed {
            return 0;
        }
        let mut appended = 0_usize;
        for msg in replay {
            if self.absorb_echo(msg) {
                continue;
            }
            if self.push_unique(msg.clone()) == Applied::Appended {
                appended += 1;
            }
        }
        log::debug!("merged history: {appended} new of {}", replay.len());
        appended
    }

    /// Echo the user's own message before it is sent.
    ///
    /// Returns the entry to send, or `None` once sealed.
    pub fn append_local(&mut self, text: &str, nickname: &str, avatar: &str, now_ms: i64) -> Option<ChatMessage> {
        if self.sealed {
            return None;
        }
        let msg = ChatMessage {
            id: Uuid::new_v4().to_string(),
            is_system_message: false,
            sender_nickname: nickname.to_owned(),
            sender_icon: avatar.to_owned(),
            body: text.to_owned(),
            timestamp: now_ms,
        };
        self.pending_echoes.push_back(PendingEcho {
            id: msg.id.clone(),
            sender: msg.sender_nickname.clone(),
            body: msg.body.clone(),
        });
        self.ids.insert(msg.id.clone());
        self.log.push(msg.clone());
        Some(msg)
    }

    /// Validate and append a live push.
    pub fn append_inbound(&mut self, event: &InboundEvent, now_ms: i64) -> Applied {
        if self.sealed {
            return Applied::Sealed;
        }
        let InboundEvent::SendMessage(data) = event else {
            return Applied::Ignored;
        };
        let Some(msg) = parse_chat_message(data, now_ms) else {
            let err = ChatError::MalformedEvent(format!("sendMessage payload is not an object: {data}"));
            log::warn!("{err}");
            return Applied::Ignored;
        };

        if self.absorb_echo(&msg) {
            log::debug!("suppressed server echo of own message from {}", msg.sender_nickname);
            return Applied::Duplicate;
        }
        self.close_echo_window();
        self.push_unique(msg)
    }

    /// Current ordered log.
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.log.clone()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.log
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Write the log to the store under `room_id`.
    pub fn persist(&self, store: &SessionStore, room_id: &str) -> Result<(), ChatError> {
        store.save_log(room_id, &self.log)
    }

    /// Freeze the log; later mutations are ignored.
    pub fn seal(&mut self) {
        self.sealed = true;
        self.pending_echoes.clear();
    }

    fn push_unique(&mut self, msg: ChatMessage) -> Applied {
        if self.presence.is_noise(&msg) {
            return Applied::Filtered;
        }
        if !self.ids.insert(msg.id.clone()) {
            return Applied::Duplicate;
        }
        self.log.push(msg);
        Applied::Appended
    }

    /// Consume the pending echo `msg` repeats, if any.
    ///
    /// A content match also records the server's id so later copies dedup.
    fn absorb_echo(&mut self, msg: &ChatMessage) -> bool {
        if self.settle_echo_by_id(&msg.id) {
            return true;
        }
        if !msg.is_system_message && self.settle_echo_by_content(msg) {
            self.ids.insert(msg.id.clone());
            return true;
        }
        false
    }

    fn close_echo_window(&mut self) {
        if !self.pending_echoes.is_empty() {
            log::debug!("dropping {} unconfirmed echoes", self.pending_echoes.len());
            self.pending_echoes.clear();
        }
    }

    fn settle_echo_by_id(&mut self, id: &str) -> bool {
        let pending = self.pending_echoes.iter().position(|p| p.id == id);
        if let Some(pos) = pending {
            self.pending_echoes.remove(pos);
        }
        pending.is_some()
    }

    fn settle_echo_by_content(&mut self, msg: &ChatMessage) -> bool {
        let pending = self
            .pending_echoes
            .iter()
            .position(|p| p.sender == msg.sender_nickname && p.body == msg.body);
        if let Some(pos) = pending {
            self.pending_echoes.remove(pos);
        }
        pending.is_some()
    }
}
