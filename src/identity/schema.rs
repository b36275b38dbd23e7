//! Schema of the identity database: one row per mirrored remote item.

use crate::sqlite_column;
use crate::sqlite_persistence::{SqlType, Table, VersionedSchema};

const MAPPING_TABLE: Table = Table {
    name: "mapping",
    columns: &[
        sqlite_column!(
            "remote_id",
            &SqlType::Text,
            is_primary_key = true,
            non_null = true
        ),
        sqlite_column!("local_kind", &SqlType::Text, non_null = true),
        sqlite_column!("local_id", &SqlType::Integer, non_null = true),
        sqlite_column!("local_file_id", &SqlType::Integer),
        sqlite_column!("local_path_id", &SqlType::Integer),
        sqlite_column!("parent_local_id", &SqlType::Integer),
        sqlite_column!("checksum", &SqlType::Text),
        sqlite_column!("view_id", &SqlType::Text),
    ],
    indices: &[
        ("idx_mapping_local", "local_id, local_kind"),
        ("idx_mapping_parent", "parent_local_id, local_kind"),
    ],
    unique_constraints: &[],
};

pub const IDENTITY_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[MAPPING_TABLE],
    migration: None,
}];
