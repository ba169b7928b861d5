//! Authoritative in-memory channel registry.
//!
//! Holds every live channel (in creation order), the name -> id index and
//! the global message log. The three are kept in the same shape they are
//! persisted in, so a save serializes them without copying.

use tracing::{info, warn};

use salon_shared::{ChannelError, ChannelId, ChannelSummary, Message, SessionId};
use salon_store::{Channel, ChannelIndex, ChannelSnapshot, MessageLog};

use crate::session::SessionTable;

pub struct ChannelRegistry {
    channels: ChannelSnapshot,
    index: ChannelIndex,
    history: MessageLog,
}

impl ChannelRegistry {
    /// A registry containing only General and an empty log.
    pub fn new() -> Self {
        Self {
            channels: ChannelSnapshot::default(),
            index: ChannelIndex::default(),
            history: MessageLog::default(),
        }
    }

    /// Rebuild a registry from persisted collections, repairing anything
    /// that would break the registry invariants: duplicate ids, duplicate
    /// names, a missing General channel, or an index that disagrees with the
    /// channel list.
    pub fn from_snapshots(channels: ChannelSnapshot, index: ChannelIndex, history: MessageLog) -> Self {
        let mut repaired: Vec<Channel> = Vec::with_capacity(channels.0.len() + 1);

        for mut channel in channels.0 {
            if repaired.iter().any(|c| c.id == channel.id) {
                warn!(channel = %channel.id, "dropping duplicate channel id from snapshot");
                continue;
            }

            if repaired.iter().any(|c| c.name == channel.name) {
                let original = channel.name.clone();
                let mut n = 2;
                while repaired.iter().any(|c| c.name == channel.name) {
                    channel.name = format!("{original} ({n})");
                    n += 1;
                }
                warn!(
                    channel = %channel.id,
                    from = %original,
                    to = %channel.name,
                    "renamed channel with duplicate name"
                );
            }

            repaired.push(channel);
        }

        if !repaired.iter().any(|c| c.id.is_general()) {
            warn!("snapshot has no General channel, re-creating it");
            let mut general = Channel::general();
            while repaired.iter().any(|c| c.name == general.name) {
                general.name.push('_');
            }
            repaired.insert(0, general);
        }

        let channels = ChannelSnapshot(repaired);
        let rebuilt = ChannelIndex::from_snapshot(&channels);
        if rebuilt != index {
            warn!(
                stored = index.0.len(),
                rebuilt = rebuilt.0.len(),
                "channel index disagrees with registry, rebuilding"
            );
        }

        info!(
            channels = channels.0.len(),
            messages = history.0.len(),
            "channel registry loaded"
        );

        Self {
            channels,
            index: rebuilt,
            history,
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    pub fn create_channel(&mut self, name: &str) -> Result<ChannelId, ChannelError> {
        let name = validate_name(name)?;
        if self.index.0.contains_key(name) {
            return Err(ChannelError::DuplicateName(name.to_string()));
        }

        let id = ChannelId::new();
        self.channels.0.push(Channel::new(id.clone(), name));
        self.index.0.insert(name.to_string(), id.clone());

        info!(channel = %id, name, "channel created");
        Ok(id)
    }

    /// Remove a channel and return the sessions that were in it. General
    /// cannot be deleted.
    pub fn delete_channel(
        &mut self,
        name: &str,
        sessions: &SessionTable,
    ) -> Result<Vec<SessionId>, ChannelError> {
        let id = self.resolve_by_name(name)?;
        if id.is_general() {
            return Err(ChannelError::Protected);
        }

        let pos = self.position(&id).ok_or_else(|| ChannelError::NotFound(name.to_string()))?;
        let removed = self.channels.0.remove(pos);
        self.index.0.remove(&removed.name);

        let evicted = sessions.in_channel(&id);
        info!(
            channel = %id,
            name = %removed.name,
            messages = removed.messages.len(),
            evicted = evicted.len(),
            "channel deleted"
        );
        Ok(evicted)
    }

    /// Not reachable from any command yet; keeps the index in step with
    /// the channel list when used.
    #[allow(dead_code)]
    pub fn rename_channel(&mut self, old: &str, new: &str) -> Result<ChannelId, ChannelError> {
        let new = validate_name(new)?;
        let id = self.resolve_by_name(old)?;
        if old.trim() == new {
            return Ok(id);
        }
        if self.index.0.contains_key(new) {
            return Err(ChannelError::DuplicateName(new.to_string()));
        }

        let channel = self
            .get_channel_mut(&id)
            .ok_or_else(|| ChannelError::NotFound(old.to_string()))?;
        let previous = std::mem::replace(&mut channel.name, new.to_string());
        self.index.0.remove(&previous);
        self.index.0.insert(new.to_string(), id.clone());

        info!(channel = %id, from = %previous, to = new, "channel renamed");
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    pub fn resolve_by_name(&self, name: &str) -> Result<ChannelId, ChannelError> {
        let name = name.trim();
        self.index
            .0
            .get(name)
            .cloned()
            .ok_or_else(|| ChannelError::NotFound(name.to_string()))
    }

    pub fn get_channel(&self, id: &ChannelId) -> Result<&Channel, ChannelError> {
        self.channels
            .0
            .iter()
            .find(|c| &c.id == id)
            .ok_or_else(|| ChannelError::NotFound(id.to_string()))
    }

    /// Names containing `query`, case-insensitively, in creation order.
    pub fn list_matching(&self, query: &str) -> Vec<String> {
        let needle = query.trim().to_lowercase();
        self.channels
            .0
            .iter()
            .filter(|c| c.name.to_lowercase().contains(&needle))
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn summaries(&self) -> Vec<ChannelSummary> {
        self.channels
            .0
            .iter()
            .map(|c| ChannelSummary {
                id: c.id.clone(),
                name: c.name.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.channels.0.len()
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    /// Append to the channel's history and to the global log.
    pub fn append_message(&mut self, id: &ChannelId, message: Message) -> Result<(), ChannelError> {
        let channel = self
            .get_channel_mut(id)
            .ok_or_else(|| ChannelError::NotFound(id.to_string()))?;
        channel.messages.push(message.clone());
        self.history.0.push(message);
        Ok(())
    }

    pub fn history(&self) -> &MessageLog {
        &self.history
    }

    pub fn channels(&self) -> &ChannelSnapshot {
        &self.channels
    }

    pub fn index(&self) -> &ChannelIndex {
        &self.index
    }

    fn position(&self, id: &ChannelId) -> Option<usize> {
        self.channels.0.iter().position(|c| &c.id == id)
    }

    fn get_channel_mut(&mut self, id: &ChannelId) -> Option<&mut Channel> {
        self.channels.0.iter_mut().find(|c| &c.id == id)
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_name(name: &str) -> Result<&str, ChannelError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ChannelError::InvalidName);
    }
    Ok(name)
}
