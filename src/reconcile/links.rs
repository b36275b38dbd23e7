//! Set reconciliation of named associations against master + link tables.
//!
//! Master rows are shared by every item and looked up case-insensitively.
//! After [`reconcile`] the links of an item are exactly the requested names
//! and every master row it stopped referencing is collected if unused.

use crate::library::LocalKind;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum AssociationKind {
    Genre,
    Tag,
    Studio,
    Country,
}

/// Static SQL of one master/link table pair.
pub struct LinkTable {
    pub master: &'static str,
    find_master_sql: &'static str,
    next_master_id_sql: &'static str,
    insert_master_sql: &'static str,
    current_links_sql: &'static str,
    insert_link_sql: &'static str,
    delete_link_sql: &'static str,
    is_referenced_sql: &'static str,
    delete_master_sql: &'static str,
}

macro_rules! link_table {
    ($master:literal, $link:literal) => {
        LinkTable {
            master: $master,
            find_master_sql: concat!("SELECT id FROM ", $master, " WHERE name = ?1"),
            next_master_id_sql: concat!("SELECT COALESCE(MAX(id), 0) + 1 FROM ", $master),
            insert_master_sql: concat!("INSERT INTO ", $master, " (id, name) VALUES (?1, ?2)"),
            current_links_sql: concat!(
                "SELECT master_id FROM ", $link, " WHERE media_id = ?1 AND media_type = ?2"
            ),
            insert_link_sql: concat!(
                "INSERT OR IGNORE INTO ", $link,
                " (master_id, media_id, media_type) VALUES (?1, ?2, ?3)"
            ),
            delete_link_sql: concat!(
                "DELETE FROM ", $link, " WHERE master_id = ?1 AND media_id = ?2 AND media_type = ?3"
            ),
            is_referenced_sql: concat!("SELECT 1 FROM ", $link, " WHERE master_id = ?1 LIMIT 1"),
            delete_master_sql: concat!("DELETE FROM ", $master, " WHERE id = ?1"),
        }
    };
}

const GENRE_LINKS: LinkTable = link_table!("genre", "genre_link");
const TAG_LINKS: LinkTable = link_table!("tag", "tag_link");
const STUDIO_LINKS: LinkTable = link_table!("studio", "studio_link");
const COUNTRY_LINKS: LinkTable = link_table!("country", "country_link");

impl AssociationKind {
    pub const ALL: [AssociationKind; 4] = [
        AssociationKind::Genre,
        AssociationKind::Tag,
        AssociationKind::Studio,
        AssociationKind::Country,
    ];

    pub fn table(&self) -> &'static LinkTable {
        match self {
            AssociationKind::Genre => &GENRE_LINKS,
            AssociationKind::Tag => &TAG_LINKS,
            AssociationKind::Studio => &STUDIO_LINKS,
            AssociationKind::Country => &COUNTRY_LINKS,
        }
    }
}

/// Summary of one reconciliation, mostly for logs and tests.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileChanges {
    pub added: usize,
    pub removed: usize,
    pub collected: usize,
}

impl ReconcileChanges {
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

fn get_or_create_master(conn: &Connection, table: &LinkTable, name: &str) -> Result<i64> {
    let existing: Option<i64> = conn
        .prepare_cached(table.find_master_sql)?
        .query_row(params![name], |r| r.get(0))
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    let id: i64 = conn
        .prepare_cached(table.next_master_id_sql)?
        .query_row([], |r| r.get(0))?;
    conn.prepare_cached(table.insert_master_sql)?
        .execute(params![id, name])?;
    debug!("Created {} '{}' ({})", table.master, name, id);
    Ok(id)
}

/// Makes the `assoc` links of `(local_id, kind)` equal to `names`.
/// Names are trimmed; empty names are ignored. An empty `names` detaches
/// the item completely.
pub fn reconcile<S: AsRef<str>>(
    conn: &Connection,
    local_id: i64,
    kind: LocalKind,
    assoc: AssociationKind,
    names: &[S],
) -> Result<ReconcileChanges> {
    let table = assoc.table();
    let media_type = kind.to_db_str();

    let mut wanted = BTreeSet::new();
    for name in names {
        let name = name.as_ref().trim();
        if name.is_empty() {
            continue;
        }
        wanted.insert(get_or_create_master(conn, table, name)?);
    }

    let current: BTreeSet<i64> = {
        let mut stmt = conn.prepare_cached(table.current_links_sql)?;
        let rows = stmt
            .query_map(params![local_id, media_type], |r| r.get(0))?
            .collect::<rusqlite::Result<BTreeSet<i64>>>()?;
        rows
    };

    let mut changes = ReconcileChanges::default();
    for id in wanted.difference(&current) {
        conn.prepare_cached(table.insert_link_sql)?
            .execute(params![id, local_id, media_type])?;
        changes.added += 1;
    }
    for id in current.difference(&wanted) {
        conn.prepare_cached(table.delete_link_sql)?
            .execute(params![id, local_id, media_type])?;
        changes.removed += 1;

        let referenced = conn
            .prepare_cached(table.is_referenced_sql)?
            .query_row(params![id], |_| Ok(()))
            .optional()?
            .is_some();
        if !referenced {
            conn.prepare_cached(table.delete_master_sql)?
                .execute(params![id])?;
            debug!("Collected orphan {} {}", table.master, id);
            changes.collected += 1;
        }
    }
    Ok(changes)
}

/// Detaches every association of `(local_id, kind)`.
pub fn detach_all(conn: &Connection, local_id: i64, kind: LocalKind) -> Result<()> {
    let none: [&str; 0] = [];
    for assoc in AssociationKind::ALL {
        reconcile(conn, local_id, kind, assoc, &none)?;
    }
    Ok(())
}

/// Names linked to `(local_id, kind)`, sorted case-insensitively.
pub fn linked_names(
    conn: &Connection,
    local_id: i64,
    kind: LocalKind,
    assoc: AssociationKind,
) -> Result<Vec<String>> {
    let table = assoc.table();
    let sql = format!(
        "SELECT m.name FROM {master} m JOIN {master}_link l ON l.master_id = m.id
         WHERE l.media_id = ?1 AND l.media_type = ?2 ORDER BY m.name COLLATE NOCASE",
        master = table.master
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let names = stmt
        .query_map(params![local_id, kind.to_db_str()], |r| r.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::LIBRARY_VERSIONED_SCHEMAS;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        LIBRARY_VERSIONED_SCHEMAS[0].create(&conn).unwrap();
        conn
    }

    fn master_names(conn: &Connection, master: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("SELECT name FROM {} ORDER BY name", master))
            .unwrap();
        stmt.query_map([], |r| r.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
    }

    fn orphan_masters(conn: &Connection, master: &str) -> i64 {
        conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {m} WHERE id NOT IN (SELECT master_id FROM {m}_link)",
                m = master
            ),
            [],
            |r| r.get(0),
        )
        .unwrap()
    }

    #[test]
    fn narrowing_collects_unused_master_rows() {
        let conn = conn();
        reconcile(&conn, 1, LocalKind::Movie, AssociationKind::Genre, &["Action", "Comedy"])
            .unwrap();
        let comedy_id: i64 = conn
            .query_row("SELECT id FROM genre WHERE name = 'Comedy'", [], |r| r.get(0))
            .unwrap();

        let changes =
            reconcile(&conn, 1, LocalKind::Movie, AssociationKind::Genre, &["Comedy"]).unwrap();
        assert_eq!(
            changes,
            ReconcileChanges {
                added: 0,
                removed: 1,
                collected: 1
            }
        );
        assert_eq!(master_names(&conn, "genre"), vec!["Comedy"]);
        let still: i64 = conn
            .query_row("SELECT id FROM genre WHERE name = 'Comedy'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(still, comedy_id);
    }

    #[test]
    fn shared_master_survives_one_detach() {
        let conn = conn();
        reconcile(&conn, 1, LocalKind::Movie, AssociationKind::Genre, &["Action"]).unwrap();
        reconcile(&conn, 1, LocalKind::Episode, AssociationKind::Genre, &["action"]).unwrap();
        assert_eq!(master_names(&conn, "genre"), vec!["Action"]);

        let changes = reconcile::<&str>(&conn, 1, LocalKind::Movie, AssociationKind::Genre, &[])
            .unwrap();
        assert_eq!(changes.collected, 0);
        assert_eq!(master_names(&conn, "genre"), vec!["Action"]);

        detach_all(&conn, 1, LocalKind::Episode).unwrap();
        assert!(master_names(&conn, "genre").is_empty());
    }

    #[test]
    fn links_equal_last_set_after_any_sequence() {
        let conn = conn();
        let sequence: [&[&str]; 6] = [
            &["Drama", "Crime"],
            &["crime", "Thriller", "drama"],
            &[],
            &["Western"],
            &["Western", "Drama", " "],
            &["Noir"],
        ];
        for names in sequence {
            reconcile(&conn, 7, LocalKind::TvShow, AssociationKind::Genre, names).unwrap();
            reconcile(&conn, 8, LocalKind::TvShow, AssociationKind::Genre, &["Drama"]).unwrap();
            assert_eq!(orphan_masters(&conn, "genre"), 0);
        }
        assert_eq!(
            linked_names(&conn, 7, LocalKind::TvShow, AssociationKind::Genre).unwrap(),
            vec!["Noir"]
        );
        assert_eq!(master_names(&conn, "genre"), vec!["Drama", "Noir"]);
    }

    #[test]
    fn unchanged_set_writes_nothing() {
        let conn = conn();
        reconcile(&conn, 1, LocalKind::Movie, AssociationKind::Studio, &["HBO"]).unwrap();
        let changes =
            reconcile(&conn, 1, LocalKind::Movie, AssociationKind::Studio, &["hbo"]).unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn kinds_do_not_share_links() {
        let conn = conn();
        reconcile(&conn, 1, LocalKind::Movie, AssociationKind::Country, &["France"]).unwrap();
        reconcile(&conn, 1, LocalKind::Movie, AssociationKind::Tag, &["Movies"]).unwrap();
        detach_all(&conn, 1, LocalKind::Movie).unwrap();
        assert!(master_names(&conn, "country").is_empty());
        assert!(master_names(&conn, "tag").is_empty());
    }
}
