//! Data models for the IPTV channel browser

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// UI Tab selection
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tab {
    Channels,
    Favorites,
    Recent,
    Console,
}

/// Server-side channel identity. The wire value may be a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<i64> for ChannelId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for ChannelId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => ChannelId(n.to_string()),
            RawId::Text(s) => ChannelId(s),
        })
    }
}

/// Channel snapshot as served by `/api/channels`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub channel_url: String,
}

/// Uniform response wrapper used by every endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Payload of a successful `POST /api/auth/login`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FavoriteFlag {
    #[serde(default)]
    pub is_favorite: bool,
}

/// Persisted credential state
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub login_time: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_numeric_id() {
        let json = r#"{"id":42,"name":"CNN","category":"News","country":"US","channelUrl":"http://x/cnn.m3u8"}"#;
        let channel: Channel = serde_json::from_str(json).unwrap();
        assert_eq!(channel.id, ChannelId::from(42));
        assert_eq!(channel.channel_url, "http://x/cnn.m3u8");
        assert_eq!(channel.logo, None);
    }

    #[test]
    fn test_channel_string_id() {
        let json = r#"{"id":"bbc-one","name":"BBC One"}"#;
        let channel: Channel = serde_json::from_str(json).unwrap();
        assert_eq!(channel.id.as_str(), "bbc-one");
        assert!(channel.channel_url.is_empty());
    }

    #[test]
    fn test_envelope_without_data() {
        let env: Envelope<Vec<Channel>> = serde_json::from_str(r#"{"success":false,"message":"nope"}"#).unwrap();
        assert!(!env.success);
        assert!(env.data.is_none());
        assert_eq!(env.message.as_deref(), Some("nope"));
    }
}
