//! v001 -- Initial schema creation.
//!
//! A single key-value table holding one JSON snapshot per named collection.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS collections (
    name       TEXT PRIMARY KEY NOT NULL,   -- collection key, e.g. 'chat_history'
    data       TEXT NOT NULL,               -- JSON snapshot of the whole collection
    updated_at TEXT NOT NULL                -- RFC-3339
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
