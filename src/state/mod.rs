//! Session state modules.
//!
//! SYSTEM CONTEXT
//! ==============
//! `room` decides which room a session enters, `reconciler` owns the ordered
//! log, `store` caches both across reloads, and `session` ties them to one
//! connection. `chat` is the read-only view handed to pages.

pub mod chat;
pub mod reconciler;
pub mod room;
pub mod session;
pub mod store;
