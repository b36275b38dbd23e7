//! Typed rows of the hierarchy tables and the static SQL that writes them.
//!
//! Every entity table shares the same shape of statements (insert with an
//! explicit id, update by id, existence check, `max(id)`, delete), so they are
//! generated once per table from the column list.

use super::models::LocalKind;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, ToSql};

pub struct EntitySchema {
    pub kind: LocalKind,
    pub table: &'static str,
    pub columns: &'static [&'static str],
    insert_sql: &'static str,
    update_sql: &'static str,
    exists_sql: &'static str,
    max_id_sql: &'static str,
    delete_sql: &'static str,
}

// Named parameters are numbered in order of first appearance, so both
// statements bind `(columns..., id)` positionally.
macro_rules! entity_schema {
    ($kind:expr, $table:literal, [$($col:ident),+ $(,)?]) => {
        EntitySchema {
            kind: $kind,
            table: $table,
            columns: &[$(stringify!($col)),+],
            insert_sql: concat!(
                "INSERT INTO ", $table, " (",
                $(stringify!($col), ", ",)+
                "id) VALUES (",
                $(":", stringify!($col), ", ",)+
                ":id)"
            ),
            update_sql: concat!(
                "UPDATE ", $table, " SET ",
                $(stringify!($col), " = :", stringify!($col), ", ",)+
                "id = :id WHERE id = :id"
            ),
            exists_sql: concat!("SELECT 1 FROM ", $table, " WHERE id = ?1"),
            max_id_sql: concat!("SELECT COALESCE(MAX(id), 0) FROM ", $table),
            delete_sql: concat!("DELETE FROM ", $table, " WHERE id = ?1"),
        }
    };
}

pub const MOVIE_SCHEMA: EntitySchema = entity_schema!(
    LocalKind::Movie,
    "movie",
    [
        file_id,
        path_id,
        title,
        sort_title,
        plot,
        tagline,
        year,
        premiered,
        runtime,
        content_rating,
        genre,
        writer,
        director,
        studio,
        country,
        play_url,
        user_rating,
    ]
);

pub const TVSHOW_SCHEMA: EntitySchema = entity_schema!(
    LocalKind::TvShow,
    "tvshow",
    [path_id, title, sort_title, plot, premiered, content_rating, genre, studio]
);

pub const SEASON_SCHEMA: EntitySchema =
    entity_schema!(LocalKind::Season, "seasons", [show_id, season, name]);

pub const EPISODE_SCHEMA: EntitySchema = entity_schema!(
    LocalKind::Episode,
    "episode",
    [
        file_id,
        path_id,
        show_id,
        season_id,
        title,
        plot,
        writer,
        director,
        premiered,
        runtime,
        season_number,
        episode_number,
        play_url,
        user_rating,
    ]
);

pub const ARTIST_SCHEMA: EntitySchema = entity_schema!(
    LocalKind::Artist,
    "artist",
    [name, genres, biography, image, fanart, last_scraped]
);

pub const ALBUM_SCHEMA: EntitySchema = entity_schema!(
    LocalKind::Album,
    "album",
    [
        title,
        artists,
        year,
        genres,
        review,
        image,
        user_rating,
        last_scraped,
        release_type,
        label,
        compilation,
    ]
);

pub const SONG_SCHEMA: EntitySchema = entity_schema!(
    LocalKind::Song,
    "song",
    [
        album_id,
        path_id,
        artists,
        genres,
        title,
        track,
        duration,
        year,
        filename,
        times_played,
        last_played,
        user_rating,
        mood,
    ]
);

pub const SET_SCHEMA: EntitySchema = entity_schema!(LocalKind::Set, "sets", [name, overview]);

impl EntitySchema {
    pub fn for_kind(kind: LocalKind) -> &'static EntitySchema {
        match kind {
            LocalKind::Movie => &MOVIE_SCHEMA,
            LocalKind::TvShow => &TVSHOW_SCHEMA,
            LocalKind::Season => &SEASON_SCHEMA,
            LocalKind::Episode => &EPISODE_SCHEMA,
            LocalKind::Artist => &ARTIST_SCHEMA,
            LocalKind::Album => &ALBUM_SCHEMA,
            LocalKind::Song => &SONG_SCHEMA,
            LocalKind::Set => &SET_SCHEMA,
        }
    }

    pub fn exists(&self, conn: &Connection, id: i64) -> Result<bool> {
        let found = conn
            .prepare_cached(self.exists_sql)?
            .query_row(params![id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    /// Next free id: ids are dense and start at 1.
    pub fn next_id(&self, conn: &Connection) -> Result<i64> {
        let max: i64 = conn
            .prepare_cached(self.max_id_sql)?
            .query_row([], |r| r.get(0))?;
        Ok(max + 1)
    }

    pub fn delete(&self, conn: &Connection, id: i64) -> Result<bool> {
        let n = conn.prepare_cached(self.delete_sql)?.execute(params![id])?;
        Ok(n > 0)
    }

    pub fn count(&self, conn: &Connection) -> Result<i64> {
        Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", self.table), [], |r| {
            r.get(0)
        })?)
    }
}

/// A full row of one entity table, minus its id.
pub trait EntityRow {
    const SCHEMA: &'static EntitySchema;

    /// Values in the order of `SCHEMA.columns`.
    fn values(&self) -> Vec<&dyn ToSql>;
}

pub fn insert_row<R: EntityRow>(conn: &Connection, id: i64, row: &R) -> Result<()> {
    let mut values = row.values();
    debug_assert_eq!(values.len(), R::SCHEMA.columns.len());
    values.push(&id);
    conn.prepare_cached(R::SCHEMA.insert_sql)?
        .execute(values.as_slice())?;
    Ok(())
}

/// Returns false when no row with `id` exists.
pub fn update_row<R: EntityRow>(conn: &Connection, id: i64, row: &R) -> Result<bool> {
    let mut values = row.values();
    debug_assert_eq!(values.len(), R::SCHEMA.columns.len());
    values.push(&id);
    let n = conn
        .prepare_cached(R::SCHEMA.update_sql)?
        .execute(values.as_slice())?;
    Ok(n > 0)
}

// =============================================================================
// Rows
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MovieRow {
    pub file_id: Option<i64>,
    pub path_id: Option<i64>,
    pub title: String,
    pub sort_title: String,
    pub plot: Option<String>,
    pub tagline: Option<String>,
    pub year: Option<i64>,
    pub premiered: Option<String>,
    pub runtime: Option<i64>,
    pub content_rating: Option<String>,
    pub genre: String,
    pub writer: String,
    pub director: String,
    pub studio: Option<String>,
    pub country: String,
    pub play_url: Option<String>,
    pub user_rating: Option<i64>,
}

impl EntityRow for MovieRow {
    const SCHEMA: &'static EntitySchema = &MOVIE_SCHEMA;

    fn values(&self) -> Vec<&dyn ToSql> {
        vec![
            &self.file_id,
            &self.path_id,
            &self.title,
            &self.sort_title,
            &self.plot,
            &self.tagline,
            &self.year,
            &self.premiered,
            &self.runtime,
            &self.content_rating,
            &self.genre,
            &self.writer,
            &self.director,
            &self.studio,
            &self.country,
            &self.play_url,
            &self.user_rating,
        ]
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TvShowRow {
    pub path_id: Option<i64>,
    pub title: String,
    pub sort_title: String,
    pub plot: Option<String>,
    pub premiered: Option<String>,
    pub content_rating: Option<String>,
    pub genre: String,
    pub studio: Option<String>,
}

impl EntityRow for TvShowRow {
    const SCHEMA: &'static EntitySchema = &TVSHOW_SCHEMA;

    fn values(&self) -> Vec<&dyn ToSql> {
        vec![
            &self.path_id,
            &self.title,
            &self.sort_title,
            &self.plot,
            &self.premiered,
            &self.content_rating,
            &self.genre,
            &self.studio,
        ]
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SeasonRow {
    pub show_id: i64,
    pub season: i64,
    pub name: Option<String>,
}

impl EntityRow for SeasonRow {
    const SCHEMA: &'static EntitySchema = &SEASON_SCHEMA;

    fn values(&self) -> Vec<&dyn ToSql> {
        vec![&self.show_id, &self.season, &self.name]
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EpisodeRow {
    pub file_id: Option<i64>,
    pub path_id: Option<i64>,
    pub show_id: i64,
    pub season_id: i64,
    pub title: String,
    pub plot: Option<String>,
    pub writer: String,
    pub director: String,
    pub premiered: Option<String>,
    pub runtime: Option<i64>,
    pub season_number: i64,
    pub episode_number: i64,
    pub play_url: Option<String>,
    pub user_rating: Option<i64>,
}

impl EntityRow for EpisodeRow {
    const SCHEMA: &'static EntitySchema = &EPISODE_SCHEMA;

    fn values(&self) -> Vec<&dyn ToSql> {
        vec![
            &self.file_id,
            &self.path_id,
            &self.show_id,
            &self.season_id,
            &self.title,
            &self.plot,
            &self.writer,
            &self.director,
            &self.premiered,
            &self.runtime,
            &self.season_number,
            &self.episode_number,
            &self.play_url,
            &self.user_rating,
        ]
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArtistRow {
    pub name: String,
    pub genres: String,
    pub biography: Option<String>,
    pub image: Option<String>,
    pub fanart: Option<String>,
    pub last_scraped: Option<String>,
}

impl EntityRow for ArtistRow {
    const SCHEMA: &'static EntitySchema = &ARTIST_SCHEMA;

    fn values(&self) -> Vec<&dyn ToSql> {
        vec![
            &self.name,
            &self.genres,
            &self.biography,
            &self.image,
            &self.fanart,
            &self.last_scraped,
        ]
    }
}

pub const RELEASE_TYPE_ALBUM: &str = "album";
pub const RELEASE_TYPE_SINGLE: &str = "single";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AlbumRow {
    pub title: Option<String>,
    pub artists: Option<String>,
    pub year: Option<i64>,
    pub genres: String,
    pub review: Option<String>,
    pub image: Option<String>,
    pub user_rating: Option<i64>,
    pub last_scraped: Option<String>,
    pub release_type: String,
    pub label: Option<String>,
    pub compilation: bool,
}

impl EntityRow for AlbumRow {
    const SCHEMA: &'static EntitySchema = &ALBUM_SCHEMA;

    fn values(&self) -> Vec<&dyn ToSql> {
        vec![
            &self.title,
            &self.artists,
            &self.year,
            &self.genres,
            &self.review,
            &self.image,
            &self.user_rating,
            &self.last_scraped,
            &self.release_type,
            &self.label,
            &self.compilation,
        ]
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SongRow {
    pub album_id: i64,
    pub path_id: Option<i64>,
    pub artists: String,
    pub genres: String,
    pub title: String,
    pub track: Option<i64>,
    pub duration: Option<i64>,
    pub year: Option<i64>,
    pub filename: Option<String>,
    pub times_played: i64,
    pub last_played: Option<String>,
    pub user_rating: Option<i64>,
    pub mood: String,
}

impl EntityRow for SongRow {
    const SCHEMA: &'static EntitySchema = &SONG_SCHEMA;

    fn values(&self) -> Vec<&dyn ToSql> {
        vec![
            &self.album_id,
            &self.path_id,
            &self.artists,
            &self.genres,
            &self.title,
            &self.track,
            &self.duration,
            &self.year,
            &self.filename,
            &self.times_played,
            &self.last_played,
            &self.user_rating,
            &self.mood,
        ]
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SetRow {
    pub name: String,
    pub overview: Option<String>,
}

impl EntityRow for SetRow {
    const SCHEMA: &'static EntitySchema = &SET_SCHEMA;

    fn values(&self) -> Vec<&dyn ToSql> {
        vec![&self.name, &self.overview]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::schema::LIBRARY_VERSIONED_SCHEMAS;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        LIBRARY_VERSIONED_SCHEMAS[0].create(&conn).unwrap();
        conn
    }

    #[test]
    fn generated_sql_lists_columns_then_id() {
        assert_eq!(
            SEASON_SCHEMA.insert_sql,
            "INSERT INTO seasons (show_id, season, name, id) VALUES (:show_id, :season, :name, :id)"
        );
        assert_eq!(
            SEASON_SCHEMA.update_sql,
            "UPDATE seasons SET show_id = :show_id, season = :season, name = :name, id = :id WHERE id = :id"
        );
    }

    #[test]
    fn schemas_match_table_definitions() {
        let conn = conn();
        for kind in LocalKind::ALL {
            let schema = EntitySchema::for_kind(kind);
            let mut stmt = conn
                .prepare(&format!("PRAGMA table_info({})", schema.table))
                .unwrap();
            let names: Vec<String> = stmt
                .query_map([], |r| r.get::<_, String>(1))
                .unwrap()
                .map(|r| r.unwrap())
                .collect();
            for column in schema.columns {
                assert!(names.iter().any(|n| n == column), "{}.{}", schema.table, column);
            }
        }
    }

    #[test]
    fn ids_start_at_one_and_are_dense() {
        let conn = conn();
        assert_eq!(MOVIE_SCHEMA.next_id(&conn).unwrap(), 1);
        let row = MovieRow {
            title: "Heat".to_string(),
            sort_title: "Heat".to_string(),
            ..Default::default()
        };
        insert_row(&conn, 1, &row).unwrap();
        assert_eq!(MOVIE_SCHEMA.next_id(&conn).unwrap(), 2);
        assert!(MOVIE_SCHEMA.exists(&conn, 1).unwrap());
        assert!(!MOVIE_SCHEMA.exists(&conn, 2).unwrap());
    }

    #[test]
    fn update_overwrites_and_reports_missing_rows() {
        let conn = conn();
        let mut row = SeasonRow {
            show_id: 1,
            season: 2,
            name: None,
        };
        insert_row(&conn, 1, &row).unwrap();
        row.name = Some("Season 2".to_string());
        assert!(update_row(&conn, 1, &row).unwrap());
        assert!(!update_row(&conn, 5, &row).unwrap());

        let name: Option<String> = conn
            .query_row("SELECT name FROM seasons WHERE id = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(name.as_deref(), Some("Season 2"));

        assert!(SEASON_SCHEMA.delete(&conn, 1).unwrap());
        assert_eq!(SEASON_SCHEMA.count(&conn).unwrap(), 0);
    }
}
