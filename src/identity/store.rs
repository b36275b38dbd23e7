//! SQLite-backed identity store.
//!
//! Maps remote catalog ids to local library records. A remote id has at most
//! one mapping; several remote ids may point at the same local record (merged
//! artists, placeholder parents adopted by real ones).

use super::schema::IDENTITY_VERSIONED_SCHEMAS;
use crate::library::LocalKind;
use crate::sqlite_persistence::{open_in_memory, open_versioned};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// Prefix of remote ids minted for synthesized parents.
pub const SYNTHETIC_PREFIX: &str = "synthetic:";

#[derive(Clone, Debug, PartialEq)]
pub struct IdentityMapping {
    pub remote_id: String,
    pub local_kind: LocalKind,
    pub local_id: i64,
    pub file_id: Option<i64>,
    pub path_id: Option<i64>,
    pub parent_local_id: Option<i64>,
    pub checksum: Option<String>,
    pub view_id: Option<String>,
}

impl IdentityMapping {
    pub fn new(remote_id: impl Into<String>, local_kind: LocalKind, local_id: i64) -> Self {
        Self {
            remote_id: remote_id.into(),
            local_kind,
            local_id,
            file_id: None,
            path_id: None,
            parent_local_id: None,
            checksum: None,
            view_id: None,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        is_synthetic(&self.remote_id)
    }
}

pub fn is_synthetic(remote_id: &str) -> bool {
    remote_id.starts_with(SYNTHETIC_PREFIX)
}

/// Remote id for a placeholder record, stable for the same `(kind, key)`.
pub fn synthetic_id(kind: LocalKind, key: &str) -> String {
    format!("{}{}:{}", SYNTHETIC_PREFIX, kind.to_db_str(), key)
}

/// Change-detection token. Only ever compared for equality.
pub fn compute_checksum(remote_id: &str, last_modified: Option<&str>) -> String {
    format!("K{}{}", remote_id, last_modified.unwrap_or(""))
}

const MAPPING_COLUMNS: &str = "remote_id, local_kind, local_id, local_file_id, local_path_id, \
                               parent_local_id, checksum, view_id";

fn row_to_mapping(row: &Row) -> rusqlite::Result<IdentityMapping> {
    let kind_str: String = row.get(1)?;
    let local_kind = LocalKind::from_db_str(&kind_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown local kind '{}'", kind_str).into(),
        )
    })?;
    Ok(IdentityMapping {
        remote_id: row.get(0)?,
        local_kind,
        local_id: row.get(2)?,
        file_id: row.get(3)?,
        path_id: row.get(4)?,
        parent_local_id: row.get(5)?,
        checksum: row.get(6)?,
        view_id: row.get(7)?,
    })
}

pub struct IdentityStore {
    conn: Connection,
}

impl IdentityStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned(db_path, IDENTITY_VERSIONED_SCHEMAS, "identity")?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = open_in_memory(IDENTITY_VERSIONED_SCHEMAS, "identity")?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Cheap liveness check run before a batch touches anything.
    pub fn ping(&self) -> Result<()> {
        self.conn
            .query_row("SELECT COUNT(*) FROM mapping", [], |r| r.get::<_, i64>(0))
            .context("identity store is not reachable")?;
        Ok(())
    }

    pub fn lookup(&self, remote_id: &str) -> Result<Option<IdentityMapping>> {
        let sql = format!("SELECT {} FROM mapping WHERE remote_id = ?1", MAPPING_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![remote_id], row_to_mapping)
            .optional()?)
    }

    /// Inserts or overwrites the mapping for `mapping.remote_id`.
    pub fn upsert_mapping(&self, mapping: &IdentityMapping) -> Result<()> {
        self.conn.execute(
            "INSERT INTO mapping (remote_id, local_kind, local_id, local_file_id, local_path_id,
                                  parent_local_id, checksum, view_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(remote_id) DO UPDATE SET
                local_kind = excluded.local_kind,
                local_id = excluded.local_id,
                local_file_id = excluded.local_file_id,
                local_path_id = excluded.local_path_id,
                parent_local_id = excluded.parent_local_id,
                checksum = excluded.checksum,
                view_id = excluded.view_id",
            params![
                mapping.remote_id,
                mapping.local_kind.to_db_str(),
                mapping.local_id,
                mapping.file_id,
                mapping.path_id,
                mapping.parent_local_id,
                mapping.checksum,
                mapping.view_id,
            ],
        )?;
        Ok(())
    }

    /// Returns whether a mapping was deleted.
    pub fn delete_mapping(&self, remote_id: &str) -> Result<bool> {
        let n = self
            .conn
            .execute("DELETE FROM mapping WHERE remote_id = ?1", params![remote_id])?;
        Ok(n > 0)
    }

    pub fn update_parent(&self, remote_id: &str, parent_local_id: Option<i64>) -> Result<()> {
        self.conn.execute(
            "UPDATE mapping SET parent_local_id = ?1 WHERE remote_id = ?2",
            params![parent_local_id, remote_id],
        )?;
        Ok(())
    }

    /// Mappings of `kind` whose parent is the local record `parent_local_id`.
    pub fn children_of(&self, parent_local_id: i64, kind: LocalKind) -> Result<Vec<IdentityMapping>> {
        self.query_many(
            "parent_local_id = ?1 AND local_kind = ?2 ORDER BY remote_id",
            params![parent_local_id, kind.to_db_str()],
        )
    }

    /// All mappings pointing at the local record `(local_id, kind)`.
    pub fn by_local(&self, local_id: i64, kind: LocalKind) -> Result<Vec<IdentityMapping>> {
        self.query_many(
            "local_id = ?1 AND local_kind = ?2 ORDER BY remote_id",
            params![local_id, kind.to_db_str()],
        )
    }

    /// Highest local id of `kind` any mapping points at, 0 when none.
    pub fn max_local_id(&self, kind: LocalKind) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COALESCE(MAX(local_id), 0) FROM mapping WHERE local_kind = ?1",
            params![kind.to_db_str()],
            |r| r.get(0),
        )?)
    }

    pub fn delete_by_local(&self, local_id: i64, kind: LocalKind) -> Result<usize> {
        Ok(self.conn.execute(
            "DELETE FROM mapping WHERE local_id = ?1 AND local_kind = ?2",
            params![local_id, kind.to_db_str()],
        )?)
    }

    pub fn count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM mapping", [], |r| r.get(0))?)
    }

    fn query_many(&self, filter: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<IdentityMapping>> {
        let sql = format!("SELECT {} FROM mapping WHERE {}", MAPPING_COLUMNS, filter);
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map(params, row_to_mapping)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie_mapping(remote_id: &str, local_id: i64) -> IdentityMapping {
        IdentityMapping {
            file_id: Some(7),
            path_id: Some(3),
            checksum: Some(compute_checksum(remote_id, Some("1500000000"))),
            view_id: Some("1".to_string()),
            ..IdentityMapping::new(remote_id, LocalKind::Movie, local_id)
        }
    }

    #[test]
    fn test_checksum_concatenates_id_and_timestamp() {
        assert_eq!(compute_checksum("100", Some("1500000000")), "K1001500000000");
        assert_eq!(compute_checksum("100", None), "K100");
        assert_ne!(
            compute_checksum("100", Some("1")),
            compute_checksum("100", Some("2"))
        );
    }

    #[test]
    fn test_lookup_missing_returns_none() {
        let store = IdentityStore::open_in_memory().unwrap();
        assert!(store.lookup("nope").unwrap().is_none());
    }

    #[test]
    fn test_upsert_is_idempotent_and_overwrites_file_fields() {
        let store = IdentityStore::open_in_memory().unwrap();
        let mut mapping = movie_mapping("100", 1);
        store.upsert_mapping(&mapping).unwrap();
        store.upsert_mapping(&mapping).unwrap();
        assert_eq!(store.count().unwrap(), 1);

        mapping.file_id = Some(8);
        mapping.path_id = Some(4);
        mapping.checksum = Some("K100X".to_string());
        store.upsert_mapping(&mapping).unwrap();

        let stored = store.lookup("100").unwrap().unwrap();
        assert_eq!(stored, mapping);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_delete_mapping() {
        let store = IdentityStore::open_in_memory().unwrap();
        store.upsert_mapping(&movie_mapping("100", 1)).unwrap();
        assert!(store.delete_mapping("100").unwrap());
        assert!(!store.delete_mapping("100").unwrap());
        assert!(store.lookup("100").unwrap().is_none());
    }

    #[test]
    fn test_children_and_local_queries() {
        let store = IdentityStore::open_in_memory().unwrap();
        for (remote, local) in [("e1", 1), ("e2", 2)] {
            store
                .upsert_mapping(&IdentityMapping {
                    parent_local_id: Some(10),
                    ..IdentityMapping::new(remote, LocalKind::Episode, local)
                })
                .unwrap();
        }
        store
            .upsert_mapping(&IdentityMapping::new("a1", LocalKind::Artist, 5))
            .unwrap();
        store
            .upsert_mapping(&IdentityMapping::new("a2", LocalKind::Artist, 5))
            .unwrap();

        let children = store.children_of(10, LocalKind::Episode).unwrap();
        assert_eq!(children.len(), 2);
        assert!(store.children_of(10, LocalKind::Season).unwrap().is_empty());

        assert_eq!(store.max_local_id(LocalKind::Artist).unwrap(), 5);
        assert_eq!(store.by_local(5, LocalKind::Artist).unwrap().len(), 2);
        assert_eq!(store.delete_by_local(5, LocalKind::Artist).unwrap(), 2);
        assert!(store.by_local(5, LocalKind::Artist).unwrap().is_empty());
        assert_eq!(store.max_local_id(LocalKind::Artist).unwrap(), 0);

        store.update_parent("e1", None).unwrap();
        assert_eq!(store.children_of(10, LocalKind::Episode).unwrap().len(), 1);
    }

    #[test]
    fn test_synthetic_ids() {
        let id = synthetic_id(LocalKind::Album, "42");
        assert_eq!(id, "synthetic:album:42");
        assert!(is_synthetic(&id));
        assert!(!is_synthetic("42"));
    }
}
