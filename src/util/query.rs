//! Chat page URL helpers.

#[cfg(test)]
#[path = "query_test.rs"]
mod query_test;

/// Route of the chat page.
pub const CHAT_PATH: &str = "/chat";

/// Build `/chat?nickname=..[&roomId=..]` with both values URL-encoded.
///
/// A blank room id is left out so the chat page reuses or creates a room.
pub fn chat_url(nickname: &str, room_id: Option<&str>) -> String {
    let mut url = format!("{CHAT_PATH}?nickname={}", urlencoding::encode(nickname.trim()));
    if let Some(room_id) = room_id.map(str::trim).filter(|r| !r.is_empty()) {
        url.push_str("&roomId=");
        url.push_str(&urlencoding::encode(room_id));
    }
    url
}
