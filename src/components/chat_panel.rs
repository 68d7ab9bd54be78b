//! Room chat panel: message history and an input for sending new messages.

#[cfg(test)]
#[path = "chat_panel_test.rs"]
mod chat_panel_test;

use leptos::prelude::*;

use crate::state::chat::ChatState;

const MS_PER_MINUTE: i64 = 60_000;
const MINUTES_PER_DAY: i64 = 24 * 60;

/// `HH:MM:SS` for `ts_ms`, shifted by `offset_minutes` east of UTC.
pub fn format_clock(ts_ms: i64, offset_minutes: i64) -> String {
    let local_ms = ts_ms.saturating_add(offset_minutes.saturating_mul(MS_PER_MINUTE));
    let secs_of_day = local_ms.div_euclid(1000).rem_euclid(MINUTES_PER_DAY * 60);
    format!(
        "{:02}:{:02}:{:02}",
        secs_of_day / 3600,
        (secs_of_day / 60) % 60,
        secs_of_day % 60
    )
}

/// Local wall-clock time of `ts_ms` in the browser; UTC elsewhere.
#[allow(clippy::cast_possible_truncation)]
fn local_clock(ts_ms: i64) -> String {
    #[cfg(feature = "hydrate")]
    {
        #[allow(clippy::cast_precision_loss)]
        let date = js_sys::Date::new(&wasm_bindgen::JsValue::from_f64(ts_ms as f64));
        format_clock(ts_ms, -(date.get_timezone_offset() as i64))
    }
    #[cfg(not(feature = "hydrate"))]
    {
        format_clock(ts_ms, 0)
    }
}

/// Chat panel showing the reconciled log and an input for sending.
#[component]
pub fn ChatPanel(state: RwSignal<ChatState>, on_send: Callback<String>) -> impl IntoView {
    let input = RwSignal::new(String::new());
    let messages_ref = NodeRef::<leptos::html::Div>::new();

    Effect::new(move || {
        let _ = state.with(|s| s.messages.len());

        #[cfg(feature = "hydrate")]
        {
            if let Some(el) = messages_ref.get() {
                let scroll_height = el.scroll_height();
                el.set_scroll_top(scroll_height);
            }
        }
    });

    let can_send = move || state.with(ChatState::can_send) && !input.get().trim().is_empty();

    let do_send = move || {
        let text = input.get();
        if text.trim().is_empty() || !state.with_untracked(ChatState::can_send) {
            return;
        }
        on_send.run(text);
        input.set(String::new());
    };

    let on_keydown = move |ev: leptos::ev::KeyboardEvent| {
        if ev.key() == "Enter" && !ev.shift_key() {
            ev.prevent_default();
            do_send();
        }
    };

    view! {
        <div class="chat-panel">
            <div class="chat-panel__messages" node_ref=messages_ref>
                {move || {
                    let current = state.get();
                    if current.messages.is_empty() {
                        return view! {
                            <p class="chat-panel__empty">"No messages yet. Start the conversation!"</p>
                        }
                            .into_any();
                    }

                    current
                        .messages
                        .iter()
                        .map(|msg| {
                            let class = if msg.is_system_message {
                                "chat-panel__message chat-panel__message--system"
                            } else if current.is_own(msg) {
                                "chat-panel__message chat-panel__message--own"
                            } else {
                                "chat-panel__message chat-panel__message--other"
                            };
                            let name = msg.sender_nickname.clone();
                            let body = msg.body.clone();
                            let time = local_clock(msg.timestamp);
                            view! {
                                <div class=class>
                                    <div class="chat-panel__author">{name}</div>
                                    <div class="chat-panel__text">{body}</div>
                                    <div class="chat-panel__time">{time}</div>
                                </div>
                            }
                        })
                        .collect::<Vec<_>>()
                        .into_any()
                }}
            </div>

            <div class="chat-panel__input-row">
                <input
                    class="chat-panel__input"
                    type="text"
                    placeholder="Type your message..."
                    prop:value=move || input.get()
                    on:input=move |ev| input.set(event_target_value(&ev))
                    on:keydown=on_keydown
                />
                <button class="btn btn--primary chat-panel__send" on:click=move |_| do_send() disabled=move || !can_send()>
                    "Send"
                </button>
            </div>
        </div>
    }
}
