use anyhow::{bail, Context, Result};
use rusqlite::{params, types::Type, Connection};
use tracing::info;

pub const BASE_DB_VERSION: usize = 99999;

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            // Only mutated when optional field assignments are passed
            #[allow(unused_mut)]
            let mut column = $crate::sqlite_persistence::Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                is_unique: false,
                collate_nocase: false,
                default_value: None,
                foreign_key: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
}

impl SqlType {
    fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
        }
    }

    fn from_sql(s: &str) -> Option<&'static SqlType> {
        match s {
            "TEXT" => Some(&SqlType::Text),
            "INTEGER" => Some(&SqlType::Integer),
            "REAL" => Some(&SqlType::Real),
            _ => None,
        }
    }
}

#[allow(unused)]
pub enum ForeignKeyOnChange {
    NoAction,
    Restrict,
    SetNull,
    Cascade,
}

impl ForeignKeyOnChange {
    fn as_sql(&self) -> &'static str {
        match self {
            ForeignKeyOnChange::NoAction => "NO ACTION",
            ForeignKeyOnChange::Restrict => "RESTRICT",
            ForeignKeyOnChange::SetNull => "SET NULL",
            ForeignKeyOnChange::Cascade => "CASCADE",
        }
    }
}

pub struct ForeignKey {
    pub foreign_table: &'static str,
    pub foreign_column: &'static str,
    pub on_delete: ForeignKeyOnChange,
}

pub struct Column<'a, S: AsRef<str>> {
    pub name: S,
    pub sql_type: &'a SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub is_unique: bool,
    /// Text comparisons (lookups and UNIQUE) ignore ASCII case.
    pub collate_nocase: bool,
    pub default_value: Option<S>,
    pub foreign_key: Option<&'a ForeignKey>,
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column<'static, &'static str>],
    pub indices: &'static [(&'static str, &'static str)],
    pub unique_constraints: &'static [&'static [&'static str]],
}

impl Table {
    pub fn create_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|column| {
                let mut def = format!("{} {}", column.name, column.sql_type.as_sql());
                if column.is_primary_key {
                    def.push_str(" PRIMARY KEY");
                }
                if column.non_null {
                    def.push_str(" NOT NULL");
                }
                if column.collate_nocase {
                    def.push_str(" COLLATE NOCASE");
                }
                if column.is_unique {
                    def.push_str(" UNIQUE");
                }
                if let Some(default_value) = column.default_value {
                    def.push_str(&format!(" DEFAULT {}", default_value));
                }
                if let Some(fk) = column.foreign_key {
                    def.push_str(&format!(
                        " REFERENCES {}({}) ON DELETE {}",
                        fk.foreign_table,
                        fk.foreign_column,
                        fk.on_delete.as_sql()
                    ));
                }
                def
            })
            .chain(
                self.unique_constraints
                    .iter()
                    .map(|cols| format!("UNIQUE ({})", cols.join(", "))),
            )
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE {} ({});", self.name, columns)
    }

    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute(&self.create_sql(), params![])
            .with_context(|| format!("Failed to create table {}", self.name))?;
        for (index_name, column_name) in self.indices {
            conn.execute(
                &format!(
                    "CREATE INDEX {} ON {}({});",
                    index_name, self.name, column_name
                ),
                params![],
            )?;
        }
        Ok(())
    }

    fn validate_columns(&self, conn: &Connection) -> Result<()> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", self.name))?;
        let actual_columns = stmt
            .query_map(params![], |row| {
                let sql_type = SqlType::from_sql(&row.get::<_, String>(2)?).ok_or_else(|| {
                    rusqlite::Error::InvalidColumnType(2, "type".to_string(), Type::Text)
                })?;
                Ok(Column {
                    name: row.get::<_, String>(1)?,
                    sql_type,
                    non_null: row.get::<_, i32>(3)? == 1,
                    default_value: row.get::<_, Option<String>>(4)?,
                    is_primary_key: row.get::<_, i32>(5)? == 1,
                    is_unique: false,
                    collate_nocase: false,
                    foreign_key: None,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Error reading columns of table {}", self.name))?;

        if actual_columns.len() != self.columns.len() {
            bail!(
                "Table {} has {} columns, expected {}. Found: {}, expected: {}",
                self.name,
                actual_columns.len(),
                self.columns.len(),
                actual_columns
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                self.columns
                    .iter()
                    .map(|c| c.name)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        for (actual, expected) in actual_columns.iter().zip(self.columns.iter()) {
            if actual.name != expected.name {
                bail!(
                    "Table {} column name mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    actual.name
                );
            }
            if actual.sql_type != expected.sql_type {
                bail!(
                    "Table {} column {} type mismatch: expected {:?}, got {:?}",
                    self.name,
                    expected.name,
                    expected.sql_type,
                    actual.sql_type
                );
            }
            if actual.non_null != expected.non_null {
                bail!(
                    "Table {} column {} non-null mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.non_null,
                    actual.non_null
                );
            }
            // Defaults may come back wrapped in parentheses
            if actual.default_value.as_deref().map(strip_parentheses)
                != expected.default_value.map(strip_parentheses)
            {
                bail!(
                    "Table {} column {} default value mismatch: expected {:?}, got {:?}",
                    self.name,
                    expected.name,
                    expected.default_value,
                    actual.default_value
                );
            }
            if actual.is_primary_key != expected.is_primary_key {
                bail!(
                    "Table {} column {} primary key mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.is_primary_key,
                    actual.is_primary_key
                );
            }
        }
        Ok(())
    }

    fn validate_indices(&self, conn: &Connection) -> Result<()> {
        for (index_name, _) in self.indices {
            let exists = conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1 AND tbl_name=?2",
                    params![index_name, self.name],
                    |_| Ok(true),
                )
                .unwrap_or(false);
            if !exists {
                bail!("Table {} is missing index '{}'", self.name, index_name);
            }
        }
        Ok(())
    }

    fn validate_unique_constraints(&self, conn: &Connection) -> Result<()> {
        let expected: Vec<Vec<&str>> = self
            .columns
            .iter()
            .filter(|c| c.is_unique)
            .map(|c| vec![c.name])
            .chain(self.unique_constraints.iter().map(|cols| {
                let mut cols = cols.to_vec();
                cols.sort_unstable();
                cols
            }))
            .collect();
        if expected.is_empty() {
            return Ok(());
        }

        let mut stmt = conn.prepare(&format!("PRAGMA index_list({})", self.name))?;
        let unique_indices: Vec<String> = stmt
            .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, i32>(2)?)))?
            .filter_map(|r| r.ok())
            .filter(|(_, is_unique)| *is_unique == 1)
            .map(|(name, _)| name)
            .collect();

        let mut actual: Vec<Vec<String>> = Vec::with_capacity(unique_indices.len());
        for index_name in &unique_indices {
            let mut idx_stmt = conn.prepare(&format!("PRAGMA index_info({})", index_name))?;
            let mut cols: Vec<String> = idx_stmt
                .query_map([], |row| row.get::<_, String>(2))?
                .filter_map(|r| r.ok())
                .collect();
            cols.sort_unstable();
            actual.push(cols);
        }

        for cols in &expected {
            let found = actual
                .iter()
                .any(|a| a.iter().map(String::as_str).eq(cols.iter().copied()));
            if !found {
                bail!(
                    "Table {} is missing unique constraint on columns ({})",
                    self.name,
                    cols.join(", ")
                );
            }
        }
        Ok(())
    }

    fn validate_foreign_keys(&self, conn: &Connection) -> Result<()> {
        // id, seq, table, from, to, on_update, on_delete, match
        let mut stmt = conn.prepare(&format!("PRAGMA foreign_key_list({})", self.name))?;
        let actual: Vec<(String, String, String, String)> = stmt
            .query_map([], |row| Ok((row.get(3)?, row.get(2)?, row.get(4)?, row.get(6)?)))?
            .filter_map(|r| r.ok())
            .collect();

        for column in self.columns {
            let Some(fk) = column.foreign_key else {
                continue;
            };
            let on_delete = fk.on_delete.as_sql();
            let found = actual.iter().any(|(from, table, to, del)| {
                from == column.name
                    && table == fk.foreign_table
                    && to == fk.foreign_column
                    && del == on_delete
            });
            if found {
                continue;
            }
            match actual.iter().find(|(from, ..)| from == column.name) {
                Some((_, table, to, del)) => bail!(
                    "Table {} column {} has foreign key mismatch: expected REFERENCES {}({}) ON DELETE {}, got REFERENCES {}({}) ON DELETE {}",
                    self.name,
                    column.name,
                    fk.foreign_table,
                    fk.foreign_column,
                    on_delete,
                    table,
                    to,
                    del
                ),
                None => bail!(
                    "Table {} column {} is missing foreign key: expected REFERENCES {}({}) ON DELETE {}",
                    self.name,
                    column.name,
                    fk.foreign_table,
                    fk.foreign_column,
                    on_delete
                ),
            }
        }
        Ok(())
    }
}

pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
    pub migration: Option<fn(&Connection) -> Result<()>>,
}

fn strip_parentheses(s: &str) -> &str {
    s.strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(s)
}

impl VersionedSchema {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute("PRAGMA foreign_keys = ON;", params![])?;
        for table in self.tables {
            table.create(conn)?;
        }
        conn.pragma_update(None, "user_version", BASE_DB_VERSION + self.version)?;
        Ok(())
    }

    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.validate_columns(conn)?;
            table.validate_indices(conn)?;
            table.validate_unique_constraints(conn)?;
            table.validate_foreign_keys(conn)?;
        }
        Ok(())
    }
}

/// Brings `conn` to the latest of `schemas`: creates it on an empty database,
/// otherwise runs every pending migration inside one transaction.
pub fn migrate_if_needed(conn: &mut Connection, schemas: &[VersionedSchema], label: &str) -> Result<()> {
    let latest_version = schemas.len() - 1;
    let latest_schema = &schemas[latest_version];

    let table_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |r| r.get(0),
    )?;
    if table_count == 0 {
        info!("Creating {} db schema at version {}", label, latest_version);
        latest_schema.create(conn)?;
        return Ok(());
    }

    let db_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    if db_version < BASE_DB_VERSION as i64 {
        bail!(
            "{} db has user_version {}, which was not written by this program",
            label,
            db_version
        );
    }
    let mut current_version = (db_version - BASE_DB_VERSION as i64) as usize;
    if current_version > latest_version {
        bail!(
            "{} db is at version {}, newer than the supported {}",
            label,
            current_version,
            latest_version
        );
    }
    if current_version == latest_version {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for schema in schemas.iter().skip(current_version + 1) {
        if let Some(migration_fn) = schema.migration {
            info!(
                "Migrating {} db from version {} to {}",
                label, current_version, schema.version
            );
            migration_fn(&tx)?;
        }
        current_version = schema.version;
    }
    tx.pragma_update(None, "user_version", BASE_DB_VERSION + current_version)?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite_column;

    const OWNER_FK: ForeignKey = ForeignKey {
        foreign_table: "owner",
        foreign_column: "id",
        on_delete: ForeignKeyOnChange::Cascade,
    };

    const OWNER_TABLE: Table = Table {
        name: "owner",
        columns: &[
            sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
            sqlite_column!(
                "name",
                &SqlType::Text,
                non_null = true,
                collate_nocase = true,
                is_unique = true
            ),
        ],
        indices: &[],
        unique_constraints: &[],
    };

    const TAG_LINK_TABLE: Table = Table {
        name: "tag_link",
        columns: &[
            sqlite_column!(
                "owner_id",
                &SqlType::Integer,
                non_null = true,
                foreign_key = Some(&OWNER_FK)
            ),
            sqlite_column!("media_id", &SqlType::Integer, non_null = true),
            sqlite_column!("media_type", &SqlType::Text, non_null = true),
        ],
        indices: &[("idx_tag_link_media", "media_id, media_type")],
        unique_constraints: &[&["owner_id", "media_id", "media_type"]],
    };

    fn schema_v0() -> VersionedSchema {
        VersionedSchema {
            version: 0,
            tables: &[OWNER_TABLE, TAG_LINK_TABLE],
            migration: None,
        }
    }

    #[test]
    fn created_schema_validates_and_sets_user_version() {
        let conn = Connection::open_in_memory().unwrap();
        let schema = schema_v0();
        schema.create(&conn).unwrap();
        schema.validate(&conn).unwrap();

        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version as usize, BASE_DB_VERSION);
    }

    #[test]
    fn nocase_column_rejects_case_variant_duplicates() {
        let conn = Connection::open_in_memory().unwrap();
        schema_v0().create(&conn).unwrap();
        conn.execute("INSERT INTO owner(id, name) VALUES (1, 'Drama')", [])
            .unwrap();
        let dup = conn.execute("INSERT INTO owner(id, name) VALUES (2, 'DRAMA')", []);
        assert!(dup.is_err());

        let id: i64 = conn
            .query_row("SELECT id FROM owner WHERE name = 'drama'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(id, 1);
    }

    #[test]
    fn validate_detects_missing_index() {
        let conn = Connection::open_in_memory().unwrap();
        OWNER_TABLE.create(&conn).unwrap();
        conn.execute(
            "CREATE TABLE tag_link (owner_id INTEGER NOT NULL REFERENCES owner(id) ON DELETE CASCADE, \
             media_id INTEGER NOT NULL, media_type TEXT NOT NULL, UNIQUE (owner_id, media_id, media_type))",
            [],
        )
        .unwrap();

        let err = schema_v0().validate(&conn).unwrap_err().to_string();
        assert!(err.contains("missing index"));
        assert!(err.contains("idx_tag_link_media"));
    }

    #[test]
    fn validate_detects_missing_unique_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        OWNER_TABLE.create(&conn).unwrap();
        conn.execute(
            "CREATE TABLE tag_link (owner_id INTEGER NOT NULL REFERENCES owner(id) ON DELETE CASCADE, \
             media_id INTEGER NOT NULL, media_type TEXT NOT NULL)",
            [],
        )
        .unwrap();
        conn.execute(
            "CREATE INDEX idx_tag_link_media ON tag_link(media_id, media_type)",
            [],
        )
        .unwrap();

        let err = schema_v0().validate(&conn).unwrap_err().to_string();
        assert!(err.contains("missing unique constraint"));
    }

    #[test]
    fn validate_detects_wrong_on_delete_action() {
        let conn = Connection::open_in_memory().unwrap();
        OWNER_TABLE.create(&conn).unwrap();
        conn.execute(
            "CREATE TABLE tag_link (owner_id INTEGER NOT NULL REFERENCES owner(id) ON DELETE SET NULL, \
             media_id INTEGER NOT NULL, media_type TEXT NOT NULL, UNIQUE (media_type, media_id, owner_id))",
            [],
        )
        .unwrap();
        conn.execute(
            "CREATE INDEX idx_tag_link_media ON tag_link(media_id, media_type)",
            [],
        )
        .unwrap();

        let err = schema_v0().validate(&conn).unwrap_err().to_string();
        assert!(err.contains("foreign key mismatch"));
        assert!(err.contains("SET NULL"));
    }

    #[test]
    fn validate_detects_column_count_mismatch() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE owner (id INTEGER PRIMARY KEY)", [])
            .unwrap();
        let err = VersionedSchema {
            version: 0,
            tables: &[OWNER_TABLE],
            migration: None,
        }
        .validate(&conn)
        .unwrap_err()
        .to_string();
        assert!(err.contains("has 1 columns, expected 2"));
    }

    fn add_extra_table(conn: &Connection) -> Result<()> {
        conn.execute("CREATE TABLE extra (id INTEGER PRIMARY KEY)", [])?;
        Ok(())
    }

    #[test]
    fn migrate_creates_then_upgrades() {
        const EXTRA: Table = Table {
            name: "extra",
            columns: &[sqlite_column!("id", &SqlType::Integer, is_primary_key = true)],
            indices: &[],
            unique_constraints: &[],
        };
        let v0 = [VersionedSchema {
            version: 0,
            tables: &[OWNER_TABLE],
            migration: None,
        }];
        let v1 = [
            VersionedSchema {
                version: 0,
                tables: &[OWNER_TABLE],
                migration: None,
            },
            VersionedSchema {
                version: 1,
                tables: &[OWNER_TABLE, EXTRA],
                migration: Some(add_extra_table),
            },
        ];

        let mut conn = Connection::open_in_memory().unwrap();
        migrate_if_needed(&mut conn, &v0, "test").unwrap();
        migrate_if_needed(&mut conn, &v1, "test").unwrap();
        v1[1].validate(&conn).unwrap();

        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version as usize, BASE_DB_VERSION + 1);

        // Already at the latest version: no-op
        migrate_if_needed(&mut conn, &v1, "test").unwrap();
    }

    #[test]
    fn migrate_rejects_foreign_database() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE unrelated (id INTEGER)", []).unwrap();
        let schemas = [schema_v0()];
        let err = migrate_if_needed(&mut conn, &schemas, "test").unwrap_err();
        assert!(err.to_string().contains("not written by this program"));
    }
}
