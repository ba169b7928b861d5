use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{GENERAL_CHANNEL_ID, SYSTEM_USER};

// Channel id: "general" for the default channel, a UUID v4 string otherwise
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn general() -> Self {
        Self(GENERAL_CHANNEL_ID.to_string())
    }

    pub fn is_general(&self) -> bool {
        self.0 == GENERAL_CHANNEL_ID
    }
}

impl Default for ChannelId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one live connection. Never persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single chat message. Immutable once appended to a channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Server-side receipt time.
    pub timestamp: DateTime<Utc>,
    /// Sender display name, or `"System"` for server notices.
    pub user: String,
    pub content: String,
    /// Name of the channel at the time the message was posted.
    pub channel_name: String,
}

impl Message {
    pub fn new(
        user: impl Into<String>,
        content: impl Into<String>,
        channel_name: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            user: user.into(),
            content: content.into(),
            channel_name: channel_name.into(),
        }
    }

    pub fn system(content: impl Into<String>, channel_name: impl Into<String>) -> Self {
        Self::new(SYSTEM_USER, content, channel_name)
    }

    pub fn is_system(&self) -> bool {
        self.user == SYSTEM_USER
    }
}

/// Whether a display name would pass for the server's own sender name.
pub fn is_reserved_name(name: &str) -> bool {
    name.trim().eq_ignore_ascii_case(SYSTEM_USER)
}

/// Channel entry as sent in channel list updates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelSummary {
    pub id: ChannelId,
    pub name: String,
}
