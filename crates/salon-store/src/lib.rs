//! # salon-store
//!
//! Durable storage for the Salon chat relay, backed by SQLite.
//!
//! The relay persists three logically independent collections (the global
//! message log, the channel registry and the channel-name index). Each one
//! is stored as a whole JSON snapshot under its own key, so a save is a
//! single atomic upsert. The crate exposes a synchronous `Database` handle
//! wrapping a `rusqlite::Connection`.

pub mod backup;
pub mod collections;
pub mod database;
pub mod migrations;
pub mod models;

mod error;

pub use collections::Collection;
pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
