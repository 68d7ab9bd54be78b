//! Client configuration with documented defaults.
//!
//! SYSTEM CONTEXT
//! ==============
//! The browser build has no process environment, so values are captured at
//! build time through `option_env!`. Tests feed the same parser any lookup.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use crate::error::ChatError;

pub const DEFAULT_NICKNAME: &str = "Anonymous";
pub const DEFAULT_AVATAR: &str = "public/computing.png";
pub const UNKNOWN_SENDER: &str = "Unknown";
pub const DEFAULT_PRESENCE_PATTERN: &str = r"(?i)\b(joined|left)\b";
pub const DEFAULT_WS_PATH: &str = "/ws";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Avatar reference sent with room create/join and outgoing messages.
    pub avatar: String,
    /// Explicit websocket URL; derived from the page location when absent.
    pub server_url: Option<String>,
    /// Scopes cache keys to a browser profile.
    pub storage_profile: Option<String>,
    /// Regex matched against system message bodies to drop join/leave noise.
    pub presence_pattern: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            avatar: DEFAULT_AVATAR.to_owned(),
            server_url: None,
            storage_profile: None,
            presence_pattern: DEFAULT_PRESENCE_PATTERN.to_owned(),
        }
    }
}

impl ChatConfig {
    /// Build config from an arbitrary key lookup.
    ///
    /// Optional:
    /// - `ROOMCHAT_AVATAR`: default `public/computing.png`
    /// - `ROOMCHAT_SERVER_URL`: must start with `ws://` or `wss://`
    /// - `ROOMCHAT_STORAGE_PROFILE`: no scoping when absent
    /// - `ROOMCHAT_PRESENCE_PATTERN`: default `(?i)\b(joined|left)\b`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ChatError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let avatar = non_empty("ROOMCHAT_AVATAR").unwrap_or_else(|| DEFAULT_AVATAR.to_owned());
        let server_url = non_empty("ROOMCHAT_SERVER_URL")
            .map(|url| parse_server_url(&url))
            .transpose()?;
        let storage_profile = non_empty("ROOMCHAT_STORAGE_PROFILE");
        let presence_pattern =
            non_empty("ROOMCHAT_PRESENCE_PATTERN").unwrap_or_else(|| DEFAULT_PRESENCE_PATTERN.to_owned());
        regex::Regex::new(&presence_pattern)
            .map_err(|e| ChatError::Config(format!("ROOMCHAT_PRESENCE_PATTERN: {e}")))?;

        Ok(Self { avatar, server_url, storage_profile, presence_pattern })
    }

    /// Build config from values baked in at compile time.
    pub fn from_build_env() -> Result<Self, ChatError> {
        Self::from_lookup(|key| {
            let value = match key {
                "ROOMCHAT_AVATAR" => option_env!("ROOMCHAT_AVATAR"),
                "ROOMCHAT_SERVER_URL" => option_env!("ROOMCHAT_SERVER_URL"),
                "ROOMCHAT_STORAGE_PROFILE" => option_env!("ROOMCHAT_STORAGE_PROFILE"),
                "ROOMCHAT_PRESENCE_PATTERN" => option_env!("ROOMCHAT_PRESENCE_PATTERN"),
                _ => None,
            };
            value.map(str::to_owned)
        })
    }
}

fn parse_server_url(raw: &str) -> Result<String, ChatError> {
    if raw.starts_with("ws://") || raw.starts_with("wss://") {
        Ok(raw.trim_end_matches('/').to_owned())
    } else {
        Err(ChatError::Config(format!("ROOMCHAT_SERVER_URL must be a ws:// or wss:// URL, got {raw}")))
    }
}

/// Websocket URL for a page served from `href`/`host`.
pub fn derive_server_url(href: &str, host: &str) -> String {
    let ws_proto = if href.starts_with("https") { "wss" } else { "ws" };
    format!("{ws_proto}://{host}{DEFAULT_WS_PATH}")
}
