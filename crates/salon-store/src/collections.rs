//! Load / save of whole-collection snapshots.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{ChannelIndex, ChannelSnapshot, MessageLog};

/// A durable collection stored under a fixed key.
pub trait Collection: Serialize + DeserializeOwned + Default {
    /// Key in the `collections` table.
    const NAME: &'static str;
}

impl Collection for MessageLog {
    const NAME: &'static str = "chat_history";
}

impl Collection for ChannelSnapshot {
    const NAME: &'static str = "channels";
}

impl Collection for ChannelIndex {
    const NAME: &'static str = "channel_index";
}

impl Database {
    // ------------------------------------------------------------------
    // Raw
    // ------------------------------------------------------------------

    /// Fetch the raw JSON stored under `name`, if any.
    pub fn load_raw(&self, name: &str) -> Result<Option<String>> {
        let data = self
            .conn()
            .query_row(
                "SELECT data FROM collections WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(data)
    }

    /// Replace the raw JSON stored under `name`.
    pub fn save_raw(&self, name: &str, data: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO collections (name, data, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
            params![name, data, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Typed
    // ------------------------------------------------------------------

    /// Load a collection. `Ok(None)` when it was never saved.
    pub fn load<C: Collection>(&self) -> Result<Option<C>> {
        let Some(raw) = self.load_raw(C::NAME)? else {
            return Ok(None);
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StoreError::Serialization {
                collection: C::NAME,
                source,
            })
    }

    /// Load a collection, falling back to its default when it is absent or
    /// cannot be decoded. SQLite failures are still returned.
    pub fn load_or_default<C: Collection>(&self) -> Result<C> {
        match self.load::<C>() {
            Ok(Some(value)) => Ok(value),
            Ok(None) => {
                tracing::info!(collection = C::NAME, "collection absent, using default");
                Ok(C::default())
            }
            Err(StoreError::Serialization { collection, source }) => {
                tracing::warn!(
                    collection,
                    error = %source,
                    "collection is corrupt, using default"
                );
                Ok(C::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Overwrite a collection with a full snapshot.
    pub fn save<C: Collection>(&self, value: &C) -> Result<()> {
        let raw = serde_json::to_string(value).map_err(|source| StoreError::Serialization {
            collection: C::NAME,
            source,
        })?;
        self.save_raw(C::NAME, &raw)
    }
}
