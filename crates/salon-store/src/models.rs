//! Snapshot structs persisted in the `collections` table.
//!
//! Every struct derives `Serialize` and `Deserialize`; the on-disk form is
//! plain JSON so a snapshot can also be handed out verbatim by the history
//! export endpoint.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use salon_shared::constants::GENERAL_CHANNEL_NAME;
use salon_shared::{ChannelId, Message};

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// A chat channel and its full, append-only message history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    /// Immutable identifier, `"general"` for the default channel.
    pub id: ChannelId,
    /// Human-readable name, unique among live channels.
    pub name: String,
    /// Messages in the order they were appended.
    pub messages: Vec<Message>,
}

impl Channel {
    pub fn new(id: ChannelId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            messages: Vec::new(),
        }
    }

    /// The default channel every session starts in.
    pub fn general() -> Self {
        Self::new(ChannelId::general(), GENERAL_CHANNEL_NAME)
    }
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// Every message ever sent, across all channels.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct MessageLog(pub Vec<Message>);

/// The channel registry in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ChannelSnapshot(pub Vec<Channel>);

impl Default for ChannelSnapshot {
    fn default() -> Self {
        Self(vec![Channel::general()])
    }
}

/// Channel name -> channel id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ChannelIndex(pub BTreeMap<String, ChannelId>);

impl Default for ChannelIndex {
    fn default() -> Self {
        let mut index = BTreeMap::new();
        index.insert(GENERAL_CHANNEL_NAME.to_string(), ChannelId::general());
        Self(index)
    }
}

impl ChannelIndex {
    /// Build the index that matches a channel snapshot.
    pub fn from_snapshot(snapshot: &ChannelSnapshot) -> Self {
        Self(
            snapshot
                .0
                .iter()
                .map(|c| (c.name.clone(), c.id.clone()))
                .collect(),
        )
    }
}
