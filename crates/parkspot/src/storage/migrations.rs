//! Schema versioning for the parking store.
//!
//! The version lives in the `metadata` table. Version 1 is the plain
//! `kv_store` layout; later layouts add a step to [`run_migration`].

use rusqlite::{Connection, OptionalExtension};

use crate::error::{Error, Result};

use super::schema::{SCHEMA_STATEMENTS, SELECT_METADATA, UPSERT_METADATA};

/// The current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// Initialize the database schema.
///
/// Creates all tables if they don't exist, then runs any pending migrations
/// to bring the schema up to the current version. A database written by a
/// newer build is refused rather than silently misread.
///
/// # Errors
///
/// Returns an error if schema creation or migration fails.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }

    let version = get_schema_version(conn)?;
    if version > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {version} is newer than supported version {CURRENT_VERSION}"
            ),
        });
    }
    if version < CURRENT_VERSION {
        run_migrations(conn, version)?;
    }

    Ok(())
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (fresh database).
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let stored: Option<String> = conn
        .query_row(SELECT_METADATA, [VERSION_KEY], |row| row.get(0))
        .optional()?;

    let Some(value) = stored else {
        return Ok(0);
    };
    value.parse().map_err(|_| Error::DatabaseMigration {
        message: format!("invalid schema version: {value}"),
    })
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(UPSERT_METADATA, (VERSION_KEY, version.to_string()))?;
    Ok(())
}

/// Step from `from_version` up to [`CURRENT_VERSION`], recording each step.
fn run_migrations(conn: &Connection, from_version: i32) -> Result<()> {
    for version in (from_version + 1)..=CURRENT_VERSION {
        run_migration(conn, version)?;
        set_schema_version(conn, version)?;
    }
    Ok(())
}

/// Bring the schema from `version - 1` to `version`.
fn run_migration(_conn: &Connection, version: i32) -> Result<()> {
    match version {
        // The tables created by SCHEMA_STATEMENTS are the version 1 layout
        1 => Ok(()),
        _ => Err(Error::DatabaseMigration {
            message: format!("unknown migration version: {version}"),
        }),
    }
}
