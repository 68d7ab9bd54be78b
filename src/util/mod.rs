//! Utility helpers shared across pages and session code.
//!
//! SYSTEM CONTEXT
//! ==============
//! Utility modules isolate browser/environment concerns from session and page
//! logic so the session core stays testable natively.

pub mod clock;
pub mod query;
pub mod storage;
