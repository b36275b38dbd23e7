mod versioned_schema;

pub use versioned_schema::{
    migrate_if_needed, Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
    BASE_DB_VERSION,
};

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

/// Opens (creating if needed) a SQLite database and brings it to the latest
/// of `schemas`. Schema validation is skipped with the `no_checks` feature.
pub fn open_versioned<P: AsRef<Path>>(
    path: P,
    schemas: &[VersionedSchema],
    label: &str,
) -> Result<Connection> {
    let path = path.as_ref();
    let mut conn = Connection::open_with_flags(
        path,
        rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
            | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
            | rusqlite::OpenFlags::SQLITE_OPEN_URI
            | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("Failed to open {} database at {:?}", label, path))?;
    prepare_connection(&mut conn, schemas, label)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    Ok(conn)
}

/// In-memory counterpart of [`open_versioned`], used by tests.
pub fn open_in_memory(schemas: &[VersionedSchema], label: &str) -> Result<Connection> {
    let mut conn = Connection::open_in_memory()?;
    prepare_connection(&mut conn, schemas, label)?;
    Ok(conn)
}

fn prepare_connection(conn: &mut Connection, schemas: &[VersionedSchema], label: &str) -> Result<()> {
    migrate_if_needed(conn, schemas, label)?;
    conn.execute("PRAGMA foreign_keys = ON;", [])?;
    #[cfg(not(feature = "no_checks"))]
    schemas[schemas.len() - 1]
        .validate(conn)
        .with_context(|| format!("{} db schema validation failed", label))?;
    Ok(())
}
