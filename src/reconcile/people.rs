//! Cast and crew reconciliation.
//!
//! People live in one shared `actor` master table and are linked through
//! `actor_link` (with character and cast order), `director_link` and
//! `writer_link`. A person row is collected only once none of the three
//! link tables references it; its portrait goes with it.

use super::links::ReconcileChanges;
use crate::library::{delete_art, replace_art, ArtworkCache, LocalKind, ACTOR_MEDIA_TYPE};
use anyhow::Result;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::debug;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PersonRole {
    Actor,
    Director,
    Writer,
}

impl PersonRole {
    pub const ALL: [PersonRole; 3] = [PersonRole::Actor, PersonRole::Director, PersonRole::Writer];

    fn link_table(&self) -> &'static str {
        match self {
            PersonRole::Actor => "actor_link",
            PersonRole::Director => "director_link",
            PersonRole::Writer => "writer_link",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Person {
    pub name: String,
    /// Character played; only meaningful for actors.
    pub character: Option<String>,
    pub thumb: Option<String>,
}

impl Person {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Everyone credited on one item. Actor order is the cast order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cast {
    pub actors: Vec<Person>,
    pub directors: Vec<Person>,
    pub writers: Vec<Person>,
}

impl Cast {
    fn people(&self, role: PersonRole) -> &[Person] {
        match role {
            PersonRole::Actor => &self.actors,
            PersonRole::Director => &self.directors,
            PersonRole::Writer => &self.writers,
        }
    }
}

struct CurrentLink {
    person_id: i64,
    name: String,
    character: Option<String>,
    cast_order: i64,
}

fn current_links(
    conn: &Connection,
    local_id: i64,
    media_type: &str,
    role: PersonRole,
) -> Result<Vec<CurrentLink>> {
    let sql = match role {
        PersonRole::Actor => {
            "SELECT a.id, a.name, l.role, l.cast_order FROM actor_link l
             JOIN actor a ON a.id = l.master_id
             WHERE l.media_id = ?1 AND l.media_type = ?2 ORDER BY l.cast_order"
        }
        PersonRole::Director => {
            "SELECT a.id, a.name, NULL, 0 FROM director_link l
             JOIN actor a ON a.id = l.master_id
             WHERE l.media_id = ?1 AND l.media_type = ?2"
        }
        PersonRole::Writer => {
            "SELECT a.id, a.name, NULL, 0 FROM writer_link l
             JOIN actor a ON a.id = l.master_id
             WHERE l.media_id = ?1 AND l.media_type = ?2"
        }
    };
    let mut stmt = conn.prepare_cached(sql)?;
    let links = stmt
        .query_map(params![local_id, media_type], |r| {
            Ok(CurrentLink {
                person_id: r.get(0)?,
                name: r.get(1)?,
                character: r.get(2)?,
                cast_order: r.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(links)
}

fn get_or_create_person(
    conn: &Connection,
    person: &Person,
    cache: &dyn ArtworkCache,
) -> Result<i64> {
    let existing: Option<i64> = conn
        .prepare_cached("SELECT id FROM actor WHERE name = ?1 LIMIT 1")?
        .query_row(params![person.name], |r| r.get(0))
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    let id: i64 = conn.query_row("SELECT COALESCE(MAX(id), 0) + 1 FROM actor", [], |r| {
        r.get(0)
    })?;
    conn.execute(
        "INSERT INTO actor (id, name) VALUES (?1, ?2)",
        params![id, person.name],
    )?;
    if let Some(thumb) = person.thumb.as_deref() {
        replace_art(conn, id, ACTOR_MEDIA_TYPE, &[("thumb", Some(thumb))], cache)?;
    }
    Ok(id)
}

/// Deletes the person unless some link table still references them.
fn collect_if_orphan(conn: &Connection, person_id: i64, cache: &dyn ArtworkCache) -> Result<bool> {
    let referenced: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM actor_link WHERE master_id = ?1)
             OR EXISTS (SELECT 1 FROM director_link WHERE master_id = ?1)
             OR EXISTS (SELECT 1 FROM writer_link WHERE master_id = ?1)",
        params![person_id],
        |r| r.get(0),
    )?;
    if referenced {
        return Ok(false);
    }
    conn.execute("DELETE FROM actor WHERE id = ?1", params![person_id])?;
    delete_art(conn, person_id, ACTOR_MEDIA_TYPE, cache)?;
    debug!("Collected orphan person {}", person_id);
    Ok(true)
}

fn insert_link(
    conn: &Connection,
    role: PersonRole,
    person_id: i64,
    local_id: i64,
    media_type: &str,
    person: &Person,
    cast_order: i64,
) -> rusqlite::Result<usize> {
    match role {
        PersonRole::Actor => conn
            .prepare_cached(
                "INSERT INTO actor_link (master_id, media_id, media_type, role, cast_order)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?
            .execute(params![person_id, local_id, media_type, person.character, cast_order]),
        PersonRole::Director | PersonRole::Writer => conn.execute(
            &format!(
                "INSERT INTO {} (master_id, media_id, media_type) VALUES (?1, ?2, ?3)",
                role.link_table()
            ),
            params![person_id, local_id, media_type],
        ),
    }
}

fn reconcile_role(
    conn: &Connection,
    local_id: i64,
    kind: LocalKind,
    role: PersonRole,
    wanted: &[Person],
    released: &mut Vec<i64>,
    cache: &dyn ArtworkCache,
) -> Result<ReconcileChanges> {
    let media_type = kind.to_db_str();
    let mut pending: Vec<Option<(i64, &Person)>> = wanted
        .iter()
        .filter(|p| !p.name.trim().is_empty())
        .enumerate()
        .map(|(order, p)| Some((order as i64, p)))
        .collect();

    let mut changes = ReconcileChanges::default();
    let mut outdated = Vec::new();
    for link in current_links(conn, local_id, media_type, role)? {
        let matched = pending.iter_mut().find(|slot| {
            slot.map_or(false, |(_, p)| {
                p.name.eq_ignore_ascii_case(&link.name)
                    && (role != PersonRole::Actor || p.character == link.character)
            })
        });
        match matched {
            Some(slot) => {
                if let Some((order, _)) = slot.take() {
                    if role == PersonRole::Actor && order != link.cast_order {
                        conn.execute(
                            "UPDATE actor_link SET cast_order = ?1
                             WHERE master_id = ?2 AND media_id = ?3 AND media_type = ?4",
                            params![order, link.person_id, local_id, media_type],
                        )?;
                    }
                }
            }
            None => outdated.push(link.person_id),
        }
    }

    for person_id in outdated {
        conn.execute(
            &format!(
                "DELETE FROM {} WHERE master_id = ?1 AND media_id = ?2 AND media_type = ?3",
                role.link_table()
            ),
            params![person_id, local_id, media_type],
        )?;
        changes.removed += 1;
        released.push(person_id);
    }

    for (order, person) in pending.into_iter().flatten() {
        let person_id = get_or_create_person(conn, person, cache)?;
        match insert_link(conn, role, person_id, local_id, media_type, person, order) {
            Ok(_) => changes.added += 1,
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                // One link per person and item: a second role is dropped
                debug!(
                    "Skipping duplicate {:?} link of '{}' on {} {}",
                    role, person.name, media_type, local_id
                );
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(changes)
}

/// Makes the cast and crew links of `(local_id, kind)` equal to `cast`.
pub fn reconcile_people(
    conn: &Connection,
    local_id: i64,
    kind: LocalKind,
    cast: &Cast,
    cache: &dyn ArtworkCache,
) -> Result<ReconcileChanges> {
    let mut total = ReconcileChanges::default();
    let mut released = Vec::new();
    for role in PersonRole::ALL {
        let changes = reconcile_role(
            conn,
            local_id,
            kind,
            role,
            cast.people(role),
            &mut released,
            cache,
        )?;
        total.added += changes.added;
        total.removed += changes.removed;
    }

    // Collected only after every role is relinked: a person who changed
    // character or role keeps their id and portrait
    released.sort_unstable();
    released.dedup();
    for person_id in released {
        if collect_if_orphan(conn, person_id, cache)? {
            total.collected += 1;
        }
    }
    Ok(total)
}

pub fn detach_people(
    conn: &Connection,
    local_id: i64,
    kind: LocalKind,
    cache: &dyn ArtworkCache,
) -> Result<()> {
    reconcile_people(conn, local_id, kind, &Cast::default(), cache)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{RecordingArtworkCache, LIBRARY_VERSIONED_SCHEMAS};

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        LIBRARY_VERSIONED_SCHEMAS[0].create(&conn).unwrap();
        conn.execute("PRAGMA foreign_keys = ON", []).unwrap();
        conn
    }

    fn actor(name: &str, character: &str) -> Person {
        Person {
            name: name.to_string(),
            character: Some(character.to_string()),
            thumb: None,
        }
    }

    fn count(conn: &Connection, sql: &str) -> i64 {
        conn.query_row(sql, [], |r| r.get(0)).unwrap()
    }

    #[test]
    fn reorders_in_place_and_removes_outdated() {
        let conn = conn();
        let cache = RecordingArtworkCache::default();
        let cast = Cast {
            actors: vec![actor("Al Pacino", "Hanna"), actor("Robert De Niro", "McCauley")],
            directors: vec![Person::named("Michael Mann")],
            writers: vec![Person::named("Michael Mann")],
        };
        let changes = reconcile_people(&conn, 1, LocalKind::Movie, &cast, &cache).unwrap();
        assert_eq!(changes.added, 4);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM actor"), 3);

        let swapped = Cast {
            actors: vec![actor("Robert De Niro", "McCauley"), actor("Al Pacino", "Hanna")],
            directors: vec![],
            writers: vec![Person::named("Michael Mann")],
        };
        let changes = reconcile_people(&conn, 1, LocalKind::Movie, &swapped, &cache).unwrap();
        assert_eq!(changes.added, 0);
        assert_eq!(changes.removed, 1);
        // Still a writer, so not collected
        assert_eq!(changes.collected, 0);

        let first: String = conn
            .query_row(
                "SELECT a.name FROM actor_link l JOIN actor a ON a.id = l.master_id
                 WHERE l.cast_order = 0",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(first, "Robert De Niro");
    }

    #[test]
    fn person_changing_character_or_role_keeps_identity() {
        let conn = conn();
        let cache = RecordingArtworkCache::default();
        let with_thumb = |character: &str| Person {
            name: "Val Kilmer".to_string(),
            character: Some(character.to_string()),
            thumb: Some("http://img/val".to_string()),
        };
        let cast = Cast {
            actors: vec![with_thumb("Chris")],
            ..Default::default()
        };
        reconcile_people(&conn, 1, LocalKind::Movie, &cast, &cache).unwrap();
        let person_id = count(&conn, "SELECT id FROM actor WHERE name = 'Val Kilmer'");

        let recast = Cast {
            actors: vec![with_thumb("Neil")],
            ..Default::default()
        };
        let changes = reconcile_people(&conn, 1, LocalKind::Movie, &recast, &cache).unwrap();
        assert_eq!(changes.removed, 1);
        assert_eq!(changes.added, 1);
        assert_eq!(changes.collected, 0);

        let behind_camera = Cast {
            directors: vec![with_thumb("")],
            ..Default::default()
        };
        let changes =
            reconcile_people(&conn, 1, LocalKind::Movie, &behind_camera, &cache).unwrap();
        assert_eq!(changes.collected, 0);

        assert_eq!(
            count(&conn, "SELECT id FROM actor WHERE name = 'Val Kilmer'"),
            person_id
        );
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM actor_link"), 0);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM director_link"), 1);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM art WHERE media_type = 'actor'"), 1);
        assert!(cache.evicted().is_empty());
    }

    #[test]
    fn duplicate_person_on_same_item_is_benign() {
        let conn = conn();
        let cache = RecordingArtworkCache::default();
        let cast = Cast {
            actors: vec![actor("Peter Sellers", "Strangelove"), actor("Peter Sellers", "Muffley")],
            ..Default::default()
        };
        let changes = reconcile_people(&conn, 1, LocalKind::Movie, &cast, &cache).unwrap();
        assert_eq!(changes.added, 1);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM actor_link"), 1);
    }

    #[test]
    fn orphaned_person_loses_portrait() {
        let conn = conn();
        let cache = RecordingArtworkCache::default();
        let cast = Cast {
            actors: vec![Person {
                name: "Val Kilmer".to_string(),
                character: Some("Chris".to_string()),
                thumb: Some("http://img/val".to_string()),
            }],
            ..Default::default()
        };
        reconcile_people(&conn, 1, LocalKind::Movie, &cast, &cache).unwrap();
        reconcile_people(&conn, 2, LocalKind::Episode, &cast, &cache).unwrap();
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM art WHERE media_type = 'actor'"), 1);

        detach_people(&conn, 1, LocalKind::Movie, &cache).unwrap();
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM actor"), 1);
        assert!(cache.evicted().is_empty());

        detach_people(&conn, 2, LocalKind::Episode, &cache).unwrap();
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM actor"), 0);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM art"), 0);
        assert_eq!(cache.evicted(), vec!["http://img/val".to_string()]);
    }
}
