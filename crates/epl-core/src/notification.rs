//! Dissemination payload types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::decision::Priority;
use crate::error::CoreError;

/// Delivery channel an adapter implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Low-latency push notification.
    Push,
    Email,
    Sms,
    #[serde(alias = "websocket")]
    WebSocket,
    /// Standard display surface (dashboard tile, terminal).
    Display,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 5] = [
        Self::Push,
        Self::Email,
        Self::Sms,
        Self::WebSocket,
        Self::Display,
    ];

    /// Metric label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Email => "email",
            Self::Sms => "sms",
            Self::WebSocket => "websocket",
            Self::Display => "display",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "push" => Ok(Self::Push),
            "email" => Ok(Self::Email),
            "sms" => Ok(Self::Sms),
            "websocket" | "ws" => Ok(Self::WebSocket),
            "display" => Ok(Self::Display),
            _ => Err(CoreError::InvalidChannel(s.to_string())),
        }
    }
}

/// Unique notification identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    /// Format: `ntf_{timestamp_ms}_{uuid_short}`
    pub fn new() -> Self {
        let ts = Utc::now().timestamp_millis();
        let uuid_short = &Uuid::new_v4().to_string()[..8];
        Self(format!("ntf_{ts}_{uuid_short}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message handed to channel adapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub id: NotificationId,
    pub priority: Priority,
    /// Channels this message is targeted at.
    pub channels: Vec<ChannelKind>,
    pub title: String,
    pub body: String,
    /// Free-form structured content.
    #[serde(default)]
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    /// Adapters must not deliver after this instant.
    pub expires_at: DateTime<Utc>,
}

impl NotificationMessage {
    /// Create a message that expires `ttl` from now.
    pub fn new(
        priority: Priority,
        channels: Vec<ChannelKind>,
        title: impl Into<String>,
        body: impl Into<String>,
        payload: serde_json::Value,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: NotificationId::new(),
            priority,
            channels,
            title: title.into(),
            body: body.into(),
            payload,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Check whether the message is past its expiry at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_expiry() {
        let msg = NotificationMessage::new(
            Priority::High,
            vec![ChannelKind::Push],
            "t",
            "b",
            serde_json::Value::Null,
            Duration::minutes(15),
        );
        assert!(!msg.is_expired());
        assert!(msg.is_expired_at(msg.created_at + Duration::minutes(15)));
        assert!(!msg.is_expired_at(msg.created_at + Duration::minutes(14)));
    }

    #[test]
    fn test_channel_kind_parse() {
        assert_eq!("ws".parse::<ChannelKind>().unwrap(), ChannelKind::WebSocket);
        assert_eq!("EMAIL".parse::<ChannelKind>().unwrap(), ChannelKind::Email);
        assert!("pager".parse::<ChannelKind>().is_err());
    }
}
