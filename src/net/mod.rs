//! Networking modules for the realtime chat service.
//!
//! SYSTEM CONTEXT
//! ==============
//! `transport` defines the service contract, `connection` gates it behind a
//! ready/disposed lifecycle, and `ws_client` binds it to a browser websocket.
//! `types` and `parse` own the wire schema and its defaulting rules.

pub mod connection;
pub mod parse;
pub mod transport;
pub mod types;
pub mod ws_client;

#[cfg(test)]
pub(crate) mod scripted;
