//! `SQLite` schema definitions for parkspot.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the key-value table.
pub const CREATE_KV_STORE_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// SQL statement to read one value.
pub const SELECT_VALUE: &str = "SELECT value FROM kv_store WHERE key = ?1";

/// SQL statement to write one value, replacing any previous one.
pub const UPSERT_VALUE: &str = r"
INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
";

/// SQL statement to read one metadata entry.
pub const SELECT_METADATA: &str = "SELECT value FROM metadata WHERE key = ?1";

/// SQL statement to write one metadata entry.
pub const UPSERT_METADATA: &str = r"
INSERT INTO metadata (key, value) VALUES (?1, ?2)
ON CONFLICT(key) DO UPDATE SET value = excluded.value
";

/// SQL statement to delete one value.
pub const DELETE_VALUE: &str = "DELETE FROM kv_store WHERE key = ?1";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_KV_STORE_TABLE, CREATE_METADATA_TABLE];
