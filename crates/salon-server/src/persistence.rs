//! Durable snapshots of the registry's three collections.
//!
//! Every save writes the whole collection. Callers save before they
//! broadcast, so nothing a client has seen can be lost on restart.

use salon_store::backup::BackupPayload;
use salon_store::{ChannelIndex, ChannelSnapshot, Database, MessageLog, Result};
use tracing::debug;

use crate::registry::ChannelRegistry;

pub struct Persistence {
    db: Database,
}

impl Persistence {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Load all three collections, substituting defaults for absent or
    /// corrupt ones.
    pub fn load_registry(&self) -> Result<ChannelRegistry> {
        let channels: ChannelSnapshot = self.db.load_or_default()?;
        let index: ChannelIndex = self.db.load_or_default()?;
        let history: MessageLog = self.db.load_or_default()?;
        Ok(ChannelRegistry::from_snapshots(channels, index, history))
    }

    /// After a message append: the global log and the channel list (which
    /// carries per-channel histories).
    pub fn save_messages(&self, registry: &ChannelRegistry) -> Result<()> {
        self.db.in_transaction(|db| {
            db.save(registry.history())?;
            db.save(registry.channels())
        })?;
        debug!(messages = registry.history().0.len(), "saved message collections");
        Ok(())
    }

    /// After a create / rename / delete: the channel list and the name index.
    pub fn save_channels(&self, registry: &ChannelRegistry) -> Result<()> {
        self.db.in_transaction(|db| {
            db.save(registry.channels())?;
            db.save(registry.index())
        })?;
        debug!(channels = registry.len(), "saved channel collections");
        Ok(())
    }

    pub fn save_all(&self, registry: &ChannelRegistry) -> Result<()> {
        self.db.in_transaction(|db| {
            db.save(registry.history())?;
            db.save(registry.channels())?;
            db.save(registry.index())
        })
    }

    pub fn export_backup(&self) -> Result<BackupPayload> {
        self.db.export_backup()
    }
}
