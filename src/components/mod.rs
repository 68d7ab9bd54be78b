//! Reusable view components.

pub mod chat_panel;
