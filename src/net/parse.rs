//! Validation and defaulting for loosely typed service payloads.
//!
//! Field names have drifted across service versions, so every lookup accepts
//! a list of candidate keys and missing fields fall back to fixed defaults.

#[cfg(test)]
#[path = "parse_test.rs"]
mod parse_test;

use uuid::Uuid;

use crate::config::UNKNOWN_SENDER;
use crate::net::types::ChatMessage;

const ID_KEYS: &[&str] = &["permId", "id"];
const NICKNAME_KEYS: &[&str] = &["userNickname", "senderNickname", "nickname"];
const ICON_KEYS: &[&str] = &["userIcon", "senderIcon", "icon"];
const BODY_KEYS: &[&str] = &["body", "message", "content"];
const TIMESTAMP_KEYS: &[&str] = &["timestamp", "ts"];
const ROOM_ID_KEYS: &[&str] = &["sessionId", "roomId", "id"];

/// 9999-12-31T23:59:59.999Z; later or negative timestamps are treated as missing.
const MAX_TIMESTAMP_MS: f64 = 253_402_300_799_999.0;

pub(crate) fn pick_str<'a>(payload: &'a serde_json::Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| payload.get(*key).and_then(serde_json::Value::as_str))
}

pub(crate) fn pick_number(payload: &serde_json::Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| {
        let value = payload.get(*key)?;
        value
            .as_f64()
            .or_else(|| value.as_str().and_then(|s| s.parse::<f64>().ok()))
    })
}

/// Build a chat message from a service payload, substituting defaults.
///
/// Returns `None` only when the payload is not an object at all.
#[allow(clippy::cast_possible_truncation)]
pub fn parse_chat_message(data: &serde_json::Value, now_ms: i64) -> Option<ChatMessage> {
    if !data.is_object() {
        return None;
    }

    let sender_nickname = pick_str(data, NICKNAME_KEYS)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(UNKNOWN_SENDER)
        .to_owned();
    let sender_icon = pick_str(data, ICON_KEYS).unwrap_or_default().to_owned();
    let body = pick_str(data, BODY_KEYS).unwrap_or_default().to_owned();
    let sent_at = pick_number(data, TIMESTAMP_KEYS)
        .filter(|n| n.is_finite() && (0.0..=MAX_TIMESTAMP_MS).contains(n))
        .map(|n| n.round() as i64);
    let is_system_message = data
        .get("isSystemMessage")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);

    let id = match pick_str(data, ID_KEYS).filter(|s| !s.is_empty()) {
        Some(id) => id.to_owned(),
        None => match sent_at {
            Some(ts) => derive_message_id(&sender_nickname, ts, &body),
            None => Uuid::new_v4().to_string(),
        },
    };

    Some(ChatMessage {
        id,
        is_system_message,
        sender_nickname,
        sender_icon,
        body,
        timestamp: sent_at.unwrap_or(now_ms),
    })
}

/// Parse the `messages` array of a join reply, skipping non-object entries.
pub fn parse_history(reply: &serde_json::Value, now_ms: i64) -> Vec<ChatMessage> {
    reply
        .get("messages")
        .and_then(serde_json::Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| parse_chat_message(item, now_ms))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default()
}

/// Room id from a create reply; the service may answer with a bare string.
pub fn parse_room_id(reply: &serde_json::Value) -> Option<String> {
    reply
        .as_str()
        .or_else(|| pick_str(reply, ROOM_ID_KEYS))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
}

/// Deterministic substitute id for a message the service sent without one.
///
/// The same sender, timestamp and body always hash to the same id, so a
/// message replayed in a later session still dedups against the cache.
pub fn derive_message_id(sender: &str, timestamp: i64, body: &str) -> String {
    let key = format!("{sender}\u{1f}{timestamp}\u{1f}{body}");
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()).to_string()
}
