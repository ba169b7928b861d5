use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::error::Result;
use crate::models::{ChannelIndex, ChannelSnapshot, MessageLog};

/// Full backup payload: all three collections plus provenance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupPayload {
    /// RFC-3339 timestamp of when the backup was created
    pub created_at: String,
    /// Crate version that produced the backup
    pub version: String,
    pub chat_history: MessageLog,
    pub channels: ChannelSnapshot,
    pub channel_index: ChannelIndex,
}

impl Database {
    /// Export every collection, substituting defaults for absent ones.
    pub fn export_backup(&self) -> Result<BackupPayload> {
        Ok(BackupPayload {
            created_at: chrono::Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            chat_history: self.load_or_default()?,
            channels: self.load_or_default()?,
            channel_index: self.load_or_default()?,
        })
    }
}
