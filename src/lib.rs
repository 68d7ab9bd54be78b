//! # roomchat
//!
//! Leptos + WASM client for ephemeral group chat rooms on a hosted realtime
//! messaging service.
//!
//! The crate owns the session core (connection lifecycle, room create/join,
//! history reconciliation, local echo, disposal) plus the pages that drive
//! it. The websocket binding and `localStorage` cache are browser-only and
//! sit behind the `hydrate` feature; everything else runs natively in tests.

pub mod app;
pub mod components;
pub mod config;
pub mod error;
pub mod net;
pub mod pages;
pub mod state;
pub mod util;

/// Browser entry point: install logging and hydrate the server-rendered body.
#[cfg(feature = "hydrate")]
#[wasm_bindgen::prelude::wasm_bindgen]
pub fn hydrate() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Debug);
    log::info!("roomchat starting");
    leptos::mount::hydrate_body(app::App);
}
