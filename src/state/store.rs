//! Session store: the browser-local cache of last room and per-room logs.
//!
//! SYSTEM CONTEXT
//! ==============
//! Keys are scoped by a prefix that optionally carries a profile id. With no
//! profile the cache assumes one user per browser profile. Writes overwrite
//! the whole log; concurrent tabs are not coordinated.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{ChatError, StoreError};
use crate::net::types::ChatMessage;

const KEY_PREFIX: &str = "roomchat";

/// Raw string key-value storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Process-local storage for tests and server-side rendering.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Typed access to cached chat state.
#[derive(Clone)]
pub struct SessionStore {
    backend: Rc<dyn KeyValueStore>,
    prefix: String,
}

impl SessionStore {
    pub fn new(backend: Rc<dyn KeyValueStore>, profile: Option<&str>) -> Self {
        let prefix = match profile.map(str::trim).filter(|p| !p.is_empty()) {
            Some(profile) => format!("{KEY_PREFIX}:{profile}"),
            None => KEY_PREFIX.to_owned(),
        };
        Self { backend, prefix }
    }

    pub fn last_room_key(&self) -> String {
        format!("{}:last_room_id", self.prefix)
    }

    pub fn log_key(&self, room_id: &str) -> String {
        format!("{}:messages:{room_id}", self.prefix)
    }

    /// Last room this profile was in. Read failures count as "none".
    pub fn last_room_id(&self) -> Option<String> {
        match self.backend.get(&self.last_room_key()) {
            Ok(value) => value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty()),
            Err(e) => {
                log::warn!("last room id unreadable: {e}");
                None
            }
        }
    }

    pub fn set_last_room_id(&self, room_id: &str) -> Result<(), ChatError> {
        self.backend.set(&self.last_room_key(), room_id)?;
        Ok(())
    }

    pub fn forget_last_room_id(&self) -> Result<(), ChatError> {
        self.backend.remove(&self.last_room_key())?;
        Ok(())
    }

    /// Cached log for `room_id`; empty when nothing was cached.
    pub fn load_log(&self, room_id: &str) -> Result<Vec<ChatMessage>, ChatError> {
        let key = self.log_key(room_id);
        let Some(raw) = self.backend.get(&key)? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt { key, reason: e.to_string() }.into())
    }

    /// Cached log for `room_id`, falling back to empty on any cache error.
    pub fn load_log_or_empty(&self, room_id: &str) -> Vec<ChatMessage> {
        self.load_log(room_id).unwrap_or_else(|e| {
            log::warn!("ignoring cached log for room {room_id}: {e}");
            Vec::new()
        })
    }

    pub fn save_log(&self, room_id: &str, messages: &[ChatMessage]) -> Result<(), ChatError> {
        let raw = serde_json::to_string(messages).map_err(|e| ChatError::Cache(e.to_string()))?;
        self.backend.set(&self.log_key(room_id), &raw)?;
        Ok(())
    }
}
