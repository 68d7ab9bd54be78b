//! Chat page: one live session for the `nickname`/`roomId` in the URL.
//!
//! SYSTEM CONTEXT
//! ==============
//! The page owns a `SessionHost`. A change of query parameters disposes the
//! running session before the next one opens, and leaving the page disposes
//! it for good. The session publishes `ChatState` snapshots into a signal
//! that the panel renders.

use leptos::prelude::*;
use leptos_router::hooks::use_query_map;

use crate::components::chat_panel::ChatPanel;
use crate::config::ChatConfig;
use crate::state::chat::{ChatState, SessionStatus};
use crate::state::session::{SessionHost, SessionParams};

#[component]
pub fn ChatPage() -> impl IntoView {
    let query = use_query_map();
    let config = use_context::<ChatConfig>().unwrap_or_default();
    let state = RwSignal::new(ChatState::default());
    let host = StoredValue::new_local(SessionHost::default());

    Effect::new(move || {
        let params = query.with(|q| {
            SessionParams::from_query(q.get("nickname").as_deref(), q.get("roomId").as_deref())
        });

        #[cfg(feature = "hydrate")]
        start_session(params, &config, host, state);

        #[cfg(not(feature = "hydrate"))]
        {
            let _ = (&config, host);
            state.update(|s| s.nickname = params.nickname);
        }
    });

    on_cleanup(move || {
        host.try_update_value(SessionHost::dispose);
    });

    let on_send = Callback::new(move |text: String| {
        let Some(session) = host.try_with_value(SessionHost::current).flatten() else {
            return;
        };
        if let Err(e) = session.send_text(&text) {
            log::warn!("send failed: {e}");
            state.update(|s| s.error = Some(e.to_string()));
        }
    });

    let room_label = move || {
        state
            .with(|s| s.room_id.clone())
            .unwrap_or_else(|| "(waiting for room)".to_owned())
    };
    let status_class = move || match state.with(|s| s.status) {
        SessionStatus::Joined => "chat-page__status chat-page__status--ok",
        SessionStatus::Failed | SessionStatus::Disconnected => "chat-page__status chat-page__status--error",
        _ => "chat-page__status",
    };

    view! {
        <div class="chat-page">
            <h2>{move || format!("Welcome, {}!", state.with(|s| s.nickname.clone()))}</h2>
            <p>"You're in Room ID: " {room_label}</p>
            <p class=status_class>{move || state.with(|s| s.status.label())}</p>
            <Show when=move || state.with(|s| s.error.is_some())>
                <p class="chat-page__error">{move || state.with(|s| s.error.clone().unwrap_or_default())}</p>
            </Show>
            <ChatPanel state=state on_send=on_send/>
        </div>
    }
}

/// Open (or keep) the session for `params` and start its activation.
#[cfg(feature = "hydrate")]
fn start_session(
    params: SessionParams,
    config: &ChatConfig,
    host: StoredValue<SessionHost, LocalStorage>,
    state: RwSignal<ChatState>,
) {
    use std::rc::Rc;

    use crate::config::derive_server_url;
    use crate::net::connection::ConnectionManager;
    use crate::net::ws_client::WsConnector;
    use crate::state::session::ChatSession;
    use crate::state::store::{KeyValueStore, MemoryStore, SessionStore};
    use crate::util::storage::BrowserStore;

    let url = config.server_url.clone().unwrap_or_else(|| {
        let location = web_sys::window().map(|w| w.location());
        let href = location.as_ref().and_then(|l| l.href().ok()).unwrap_or_default();
        let page_host = location
            .as_ref()
            .and_then(|l| l.host().ok())
            .unwrap_or_else(|| "localhost:3000".to_owned());
        derive_server_url(&href, &page_host)
    });
    let backend: Rc<dyn KeyValueStore> = if BrowserStore::is_available() {
        Rc::new(BrowserStore)
    } else {
        log::warn!("localStorage unavailable; chat history will not survive a reload");
        Rc::new(MemoryStore::default())
    };
    let store = SessionStore::new(backend, config.storage_profile.as_deref());
    let manager = ConnectionManager::new(Rc::new(WsConnector::new(url)));

    let nickname = params.nickname.clone();
    let opened = host.try_update_value(|h| h.switch(params, |p| ChatSession::open(p, &manager, store, config)));
    match opened {
        Some(Ok(Some(session))) => {
            session.subscribe(move |next| state.set(next.clone()));
            leptos::task::spawn_local(async move {
                if let Err(e) = session.activate().await {
                    log::warn!("chat session did not join: {e}");
                }
            });
        }
        Some(Ok(None)) | None => {}
        Some(Err(e)) => {
            log::error!("could not open chat session: {e}");
            state.set(ChatState {
                nickname,
                status: SessionStatus::Failed,
                error: Some(e.to_string()),
                ..ChatState::default()
            });
        }
    }
}
