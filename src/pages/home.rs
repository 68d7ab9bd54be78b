//! Landing page: create a room or join one by id.

#[cfg(test)]
#[path = "home_test.rs"]
mod home_test;

use leptos::prelude::*;
use leptos_router::NavigateOptions;
use leptos_router::hooks::use_navigate;

use crate::util::query::chat_url;

pub const NICKNAME_REQUIRED: &str = "Please enter a nickname.";
pub const ROOM_AND_NICKNAME_REQUIRED: &str = "Please enter both Room ID and Nickname.";

/// Which form is open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HomeForm {
    #[default]
    None,
    Create,
    Join,
}

/// Chat URL for the create form, or the validation message.
pub fn create_target(nickname: &str) -> Result<String, &'static str> {
    if nickname.trim().is_empty() {
        return Err(NICKNAME_REQUIRED);
    }
    Ok(chat_url(nickname, None))
}

/// Chat URL for the join form, or the validation message.
pub fn join_target(room_id: &str, nickname: &str) -> Result<String, &'static str> {
    if room_id.trim().is_empty() || nickname.trim().is_empty() {
        return Err(ROOM_AND_NICKNAME_REQUIRED);
    }
    Ok(chat_url(nickname, Some(room_id)))
}

#[component]
pub fn HomePage() -> impl IntoView {
    let form = RwSignal::new(HomeForm::None);
    let nickname = RwSignal::new(String::new());
    let room_id = RwSignal::new(String::new());
    let info = RwSignal::new(String::new());
    let navigate = use_navigate();

    let go = Callback::new(move |target: Result<String, &'static str>| match target {
        Ok(url) => navigate(&url, NavigateOptions::default()),
        Err(message) => info.set(message.to_owned()),
    });

    let on_create = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        go.run(create_target(&nickname.get()));
    };

    let on_join = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        go.run(join_target(&room_id.get(), &nickname.get()));
    };

    let open_form = move |which: HomeForm| {
        form.set(which);
        info.set(String::new());
    };

    view! {
        <div class="home-page">
            <div class="home-page__actions">
                <button class="btn btn--primary" on:click=move |_| open_form(HomeForm::Create)>
                    "Create Room"
                </button>
                <button class="btn" on:click=move |_| open_form(HomeForm::Join)>
                    "Join"
                </button>
            </div>

            <Show when=move || form.get() == HomeForm::Create>
                <form class="home-form" on:submit=on_create>
                    <label>"Enter your Nickname:"</label>
                    <input
                        class="home-input"
                        type="text"
                        placeholder="Enter your nickname"
                        prop:value=move || nickname.get()
                        on:input=move |ev| nickname.set(event_target_value(&ev))
                    />
                    <button class="btn btn--primary" type="submit">"Submit"</button>
                </form>
            </Show>

            <Show when=move || form.get() == HomeForm::Join>
                <form class="home-form" on:submit=on_join>
                    <label>"Enter Room ID:"</label>
                    <input
                        class="home-input"
                        type="text"
                        placeholder="Enter Room ID"
                        prop:value=move || room_id.get()
                        on:input=move |ev| room_id.set(event_target_value(&ev))
                    />
                    <label>"Enter your Nickname:"</label>
                    <input
                        class="home-input"
                        type="text"
                        placeholder="Enter your nickname"
                        prop:value=move || nickname.get()
                        on:input=move |ev| nickname.set(event_target_value(&ev))
                    />
                    <button class="btn btn--primary" type="submit">"Join Room"</button>
                </form>
            </Show>

            <Show when=move || !info.get().is_empty()>
                <p class="home-message">{move || info.get()}</p>
            </Show>
        </div>
    }
}
