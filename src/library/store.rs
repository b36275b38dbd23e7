//! SQLite-backed local library store.
//!
//! Holds the normalized hierarchy tables plus everything hanging off them:
//! paths, files, bookmarks, stream details, unique ids, ratings and sets.
//! Callers own transaction boundaries; every method here runs on whatever
//! transaction is open on [`LibraryStore::conn`].

use super::entities::EntitySchema;
use super::models::{LibraryStats, LocalKind, Playstate, StreamDetails};
use super::schema::LIBRARY_VERSIONED_SCHEMAS;
use crate::sqlite_persistence::{open_in_memory, open_versioned};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::debug;

const BOOKMARK_PLAYER: &str = "VideoPlayer";

pub struct LibraryStore {
    conn: Connection,
}

impl LibraryStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned(db_path, LIBRARY_VERSIONED_SCHEMAS, "library")?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = open_in_memory(LIBRARY_VERSIONED_SCHEMAS, "library")?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn ping(&self) -> Result<()> {
        self.conn
            .query_row("SELECT COUNT(*) FROM path", [], |r| r.get::<_, i64>(0))
            .context("library store is not reachable")?;
        Ok(())
    }

    pub fn stats(&self) -> Result<LibraryStats> {
        let count = |table: &str| -> Result<i64> {
            Ok(self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?)
        };
        Ok(LibraryStats {
            movies: count("movie")?,
            sets: count("sets")?,
            tvshows: count("tvshow")?,
            seasons: count("seasons")?,
            episodes: count("episode")?,
            artists: count("artist")?,
            albums: count("album")?,
            songs: count("song")?,
            files: count("files")?,
            paths: count("path")?,
            genres: count("genre")?,
            tags: count("tag")?,
            studios: count("studio")?,
            countries: count("country")?,
            people: count("actor")?,
        })
    }

    // =========================================================================
    // Entity rows
    // =========================================================================

    pub fn next_id(&self, kind: LocalKind) -> Result<i64> {
        EntitySchema::for_kind(kind).next_id(&self.conn)
    }

    pub fn exists(&self, kind: LocalKind, id: i64) -> Result<bool> {
        EntitySchema::for_kind(kind).exists(&self.conn, id)
    }

    pub fn delete_entity(&self, kind: LocalKind, id: i64) -> Result<bool> {
        EntitySchema::for_kind(kind).delete(&self.conn, id)
    }

    // =========================================================================
    // Paths and files
    // =========================================================================

    pub fn find_path(&self, path: &str) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row("SELECT id FROM path WHERE path = ?1", params![path], |r| r.get(0))
            .optional()?)
    }

    /// Get-or-create a path row. An existing row keeps its id; `content` and
    /// `parent_path_id` are only filled in when given.
    pub fn add_path(
        &self,
        path: &str,
        content: Option<&str>,
        parent_path_id: Option<i64>,
    ) -> Result<i64> {
        if let Some(id) = self.find_path(path)? {
            if content.is_some() || parent_path_id.is_some() {
                self.conn.execute(
                    "UPDATE path SET content = COALESCE(?1, content),
                                     parent_path_id = COALESCE(?2, parent_path_id)
                     WHERE id = ?3",
                    params![content, parent_path_id, id],
                )?;
            }
            return Ok(id);
        }
        let id: i64 = self
            .conn
            .query_row("SELECT COALESCE(MAX(id), 0) + 1 FROM path", [], |r| r.get(0))?;
        self.conn.execute(
            "INSERT INTO path (id, path, parent_path_id, content) VALUES (?1, ?2, ?3, ?4)",
            params![id, path, parent_path_id, content],
        )?;
        debug!("Added path {} ({})", id, path);
        Ok(id)
    }

    /// Get-or-create a file row under `path_id`.
    pub fn add_file(&self, path_id: i64, filename: &str, date_added: Option<&str>) -> Result<i64> {
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM files WHERE path_id = ?1 AND filename = ?2",
                params![path_id, filename],
                |r| r.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }
        let id: i64 = self
            .conn
            .query_row("SELECT COALESCE(MAX(id), 0) + 1 FROM files", [], |r| r.get(0))?;
        self.conn.execute(
            "INSERT INTO files (id, path_id, filename, date_added) VALUES (?1, ?2, ?3, ?4)",
            params![id, path_id, filename, date_added],
        )?;
        Ok(id)
    }

    pub fn file_path_id(&self, file_id: i64) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row("SELECT path_id FROM files WHERE id = ?1", params![file_id], |r| r.get(0))
            .optional()?)
    }

    /// Removes a file with its bookmarks and stream details, then its path
    /// if nothing else references it.
    pub fn remove_file(&self, file_id: i64) -> Result<()> {
        let Some(path_id) = self.file_path_id(file_id)? else {
            return Ok(());
        };
        self.conn
            .execute("DELETE FROM bookmark WHERE file_id = ?1", params![file_id])?;
        self.conn
            .execute("DELETE FROM stream_details WHERE file_id = ?1", params![file_id])?;
        self.conn
            .execute("DELETE FROM files WHERE id = ?1", params![file_id])?;
        self.remove_path_if_orphan(path_id)?;
        Ok(())
    }

    /// Deletes the path unless a file, an item or a child path still uses it.
    pub fn remove_path_if_orphan(&self, path_id: i64) -> Result<bool> {
        let in_use: bool = self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM files WHERE path_id = ?1)
                 OR EXISTS (SELECT 1 FROM movie WHERE path_id = ?1)
                 OR EXISTS (SELECT 1 FROM tvshow WHERE path_id = ?1)
                 OR EXISTS (SELECT 1 FROM tvshowlinkpath WHERE path_id = ?1)
                 OR EXISTS (SELECT 1 FROM episode WHERE path_id = ?1)
                 OR EXISTS (SELECT 1 FROM song WHERE path_id = ?1)
                 OR EXISTS (SELECT 1 FROM path WHERE parent_path_id = ?1)",
            params![path_id],
            |r| r.get(0),
        )?;
        if in_use {
            return Ok(false);
        }
        let parent: Option<i64> = self
            .conn
            .query_row(
                "SELECT parent_path_id FROM path WHERE id = ?1",
                params![path_id],
                |r| r.get(0),
            )
            .optional()?
            .flatten();
        let n = self
            .conn
            .execute("DELETE FROM path WHERE id = ?1", params![path_id])?;
        if let Some(parent) = parent {
            self.remove_path_if_orphan(parent)?;
        }
        Ok(n > 0)
    }

    pub fn link_show_path(&self, show_id: i64, path_id: i64) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO tvshowlinkpath (show_id, path_id) VALUES (?1, ?2)",
            params![show_id, path_id],
        )?;
        Ok(())
    }

    /// Drops the show's path links and returns the unlinked path ids.
    pub fn unlink_show_paths(&self, show_id: i64) -> Result<Vec<i64>> {
        let ids = {
            let mut stmt = self
                .conn
                .prepare_cached("SELECT path_id FROM tvshowlinkpath WHERE show_id = ?1")?;
            let rows = stmt
                .query_map(params![show_id], |r| r.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            rows
        };
        self.conn
            .execute("DELETE FROM tvshowlinkpath WHERE show_id = ?1", params![show_id])?;
        Ok(ids)
    }

    // =========================================================================
    // Play state and stream details
    // =========================================================================

    /// Replaces the file's bookmark and updates its play counters. A resume
    /// point of zero clears the bookmark.
    pub fn set_playstate(&self, file_id: i64, state: &Playstate) -> Result<()> {
        self.conn
            .execute("DELETE FROM bookmark WHERE file_id = ?1", params![file_id])?;
        self.conn.execute(
            "UPDATE files SET play_count = ?1, last_played = ?2 WHERE id = ?3",
            params![state.play_count, state.last_played, file_id],
        )?;
        if state.resume_seconds > 0 {
            self.conn.execute(
                "INSERT INTO bookmark (file_id, time_seconds, total_seconds, player)
                 VALUES (?1, ?2, ?3, ?4)",
                params![file_id, state.resume_seconds, state.total_seconds, BOOKMARK_PLAYER],
            )?;
        }
        Ok(())
    }

    pub fn playstate(&self, file_id: i64) -> Result<Option<Playstate>> {
        let counters: Option<(Option<i64>, Option<String>)> = self
            .conn
            .query_row(
                "SELECT play_count, last_played FROM files WHERE id = ?1",
                params![file_id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        let Some((play_count, last_played)) = counters else {
            return Ok(None);
        };
        let bookmark: Option<(i64, i64)> = self
            .conn
            .query_row(
                "SELECT time_seconds, total_seconds FROM bookmark WHERE file_id = ?1",
                params![file_id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        let (resume_seconds, total_seconds) = bookmark.unwrap_or((0, 0));
        Ok(Some(Playstate {
            resume_seconds,
            total_seconds,
            play_count,
            last_played,
        }))
    }

    pub fn replace_streams(&self, file_id: i64, streams: &StreamDetails) -> Result<()> {
        self.conn
            .execute("DELETE FROM stream_details WHERE file_id = ?1", params![file_id])?;
        for video in &streams.video {
            self.conn.execute(
                "INSERT INTO stream_details (file_id, stream_type, video_codec, video_aspect,
                                             video_width, video_height, video_duration)
                 VALUES (?1, 0, ?2, ?3, ?4, ?5, ?6)",
                params![
                    file_id,
                    video.codec,
                    video.aspect,
                    video.width,
                    video.height,
                    video.duration
                ],
            )?;
        }
        for audio in &streams.audio {
            self.conn.execute(
                "INSERT INTO stream_details (file_id, stream_type, audio_codec, audio_channels,
                                             audio_language)
                 VALUES (?1, 1, ?2, ?3, ?4)",
                params![file_id, audio.codec, audio.channels, audio.language],
            )?;
        }
        for language in &streams.subtitles {
            self.conn.execute(
                "INSERT INTO stream_details (file_id, stream_type, subtitle_language)
                 VALUES (?1, 2, ?2)",
                params![file_id, language],
            )?;
        }
        Ok(())
    }

    /// Song play counters live on the song row itself.
    pub fn set_song_playstate(
        &self,
        song_id: i64,
        times_played: i64,
        last_played: Option<&str>,
    ) -> Result<bool> {
        let n = self.conn.execute(
            "UPDATE song SET times_played = ?1, last_played = ?2 WHERE id = ?3",
            params![times_played, last_played, song_id],
        )?;
        Ok(n > 0)
    }

    // =========================================================================
    // Unique ids and ratings
    // =========================================================================

    pub fn set_uniqueid(
        &self,
        media_id: i64,
        kind: LocalKind,
        id_type: &str,
        value: &str,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO uniqueid (media_id, media_type, value, type) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(media_id, media_type, type) DO UPDATE SET value = excluded.value",
            params![media_id, kind.to_db_str(), value, id_type],
        )?;
        Ok(())
    }

    pub fn remove_uniqueids(&self, media_id: i64, kind: LocalKind) -> Result<usize> {
        Ok(self.conn.execute(
            "DELETE FROM uniqueid WHERE media_id = ?1 AND media_type = ?2",
            params![media_id, kind.to_db_str()],
        )?)
    }

    pub fn uniqueid(&self, media_id: i64, kind: LocalKind, id_type: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM uniqueid WHERE media_id = ?1 AND media_type = ?2 AND type = ?3",
                params![media_id, kind.to_db_str(), id_type],
                |r| r.get(0),
            )
            .optional()?)
    }

    pub fn upsert_rating(
        &self,
        media_id: i64,
        kind: LocalKind,
        rating_type: &str,
        rating: f64,
        votes: Option<i64>,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO rating (media_id, media_type, rating_type, rating, votes)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(media_id, media_type, rating_type)
             DO UPDATE SET rating = excluded.rating, votes = excluded.votes",
            params![media_id, kind.to_db_str(), rating_type, rating, votes],
        )?;
        Ok(())
    }

    pub fn remove_ratings(&self, media_id: i64, kind: LocalKind) -> Result<usize> {
        Ok(self.conn.execute(
            "DELETE FROM rating WHERE media_id = ?1 AND media_type = ?2",
            params![media_id, kind.to_db_str()],
        )?)
    }

    // =========================================================================
    // Sets
    // =========================================================================

    /// Set with the given name, compared case-insensitively.
    pub fn find_set(&self, name: &str) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row("SELECT id FROM sets WHERE name = ?1", params![name], |r| r.get(0))
            .optional()?)
    }

    pub fn create_set(&self, id: i64, name: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sets (id, name) VALUES (?1, ?2)",
            params![id, name],
        )?;
        debug!("Added set {} '{}'", id, name);
        Ok(())
    }

    pub fn movie_set(&self, movie_id: i64) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row("SELECT set_id FROM movie WHERE id = ?1", params![movie_id], |r| r.get(0))
            .optional()?
            .flatten())
    }

    pub fn assign_set(&self, movie_id: i64, set_id: Option<i64>) -> Result<()> {
        self.conn.execute(
            "UPDATE movie SET set_id = ?1 WHERE id = ?2",
            params![set_id, movie_id],
        )?;
        Ok(())
    }

    /// Detaches every movie from the set; returns how many were detached.
    pub fn detach_set(&self, set_id: i64) -> Result<usize> {
        Ok(self.conn.execute(
            "UPDATE movie SET set_id = NULL WHERE set_id = ?1",
            params![set_id],
        )?)
    }

    pub fn update_set_overview(&self, set_id: i64, overview: Option<&str>) -> Result<()> {
        self.conn.execute(
            "UPDATE sets SET overview = ?1 WHERE id = ?2",
            params![overview, set_id],
        )?;
        Ok(())
    }

    // =========================================================================
    // Hierarchy lookups
    // =========================================================================

    pub fn find_season(&self, show_id: i64, season: i64) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id FROM seasons WHERE show_id = ?1 AND season = ?2",
                params![show_id, season],
                |r| r.get(0),
            )
            .optional()?)
    }

    pub fn season_show(&self, season_id: i64) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row("SELECT show_id FROM seasons WHERE id = ?1", params![season_id], |r| {
                r.get(0)
            })
            .optional()?)
    }

    /// `(show_id, season_id)` of an episode.
    pub fn episode_parents(&self, episode_id: i64) -> Result<Option<(i64, i64)>> {
        Ok(self
            .conn
            .query_row(
                "SELECT show_id, season_id FROM episode WHERE id = ?1",
                params![episode_id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?)
    }

    pub fn song_album(&self, song_id: i64) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row("SELECT album_id FROM song WHERE id = ?1", params![song_id], |r| r.get(0))
            .optional()?)
    }

    /// File and path references of a movie, episode or song.
    pub fn file_refs(&self, kind: LocalKind, id: i64) -> Result<(Option<i64>, Option<i64>)> {
        let sql = match kind {
            LocalKind::Movie => "SELECT file_id, path_id FROM movie WHERE id = ?1",
            LocalKind::Episode => "SELECT file_id, path_id FROM episode WHERE id = ?1",
            LocalKind::Song => "SELECT NULL, path_id FROM song WHERE id = ?1",
            LocalKind::TvShow => "SELECT NULL, path_id FROM tvshow WHERE id = ?1",
            _ => return Ok((None, None)),
        };
        Ok(self
            .conn
            .query_row(sql, params![id], |r| Ok((r.get(0)?, r.get(1)?)))
            .optional()?
            .unwrap_or((None, None)))
    }

    pub fn find_artist_by_name(&self, name: &str) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id FROM artist WHERE name = ?1 ORDER BY id LIMIT 1",
                params![name],
                |r| r.get(0),
            )
            .optional()?)
    }

    pub fn artist_name(&self, artist_id: i64) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row("SELECT name FROM artist WHERE id = ?1", params![artist_id], |r| r.get(0))
            .optional()?)
    }

    pub fn rename_artist(&self, artist_id: i64, name: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE artist SET name = ?1 WHERE id = ?2",
            params![name, artist_id],
        )?;
        Ok(())
    }

    /// Ids of `child_kind` rows whose parent column equals `parent_id`.
    pub fn children(&self, child_kind: LocalKind, parent_id: i64) -> Result<Vec<i64>> {
        let sql = match child_kind {
            LocalKind::Season => "SELECT id FROM seasons WHERE show_id = ?1 ORDER BY id",
            LocalKind::Episode => "SELECT id FROM episode WHERE season_id = ?1 ORDER BY id",
            LocalKind::Song => "SELECT id FROM song WHERE album_id = ?1 ORDER BY id",
            LocalKind::Album => {
                "SELECT album_id FROM album_artist WHERE artist_id = ?1 ORDER BY album_id"
            }
            LocalKind::Movie => "SELECT id FROM movie WHERE set_id = ?1 ORDER BY id",
            _ => return Ok(Vec::new()),
        };
        let mut stmt = self.conn.prepare_cached(sql)?;
        let ids = stmt
            .query_map(params![parent_id], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    pub fn episodes_of_show(&self, show_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id FROM episode WHERE show_id = ?1 ORDER BY id")?;
        let ids = stmt
            .query_map(params![show_id], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    // =========================================================================
    // Music artist links
    // =========================================================================

    pub fn set_album_artist(&self, album_id: i64, artist_id: i64, artist_name: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM album_artist WHERE album_id = ?1", params![album_id])?;
        self.conn.execute(
            "INSERT INTO album_artist (artist_id, album_id, artist_name) VALUES (?1, ?2, ?3)",
            params![artist_id, album_id, artist_name],
        )?;
        Ok(())
    }

    pub fn album_artist(&self, album_id: i64) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row(
                "SELECT artist_id FROM album_artist WHERE album_id = ?1 LIMIT 1",
                params![album_id],
                |r| r.get(0),
            )
            .optional()?)
    }

    pub fn set_song_artist(&self, song_id: i64, artist_id: i64, artist_name: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM song_artist WHERE song_id = ?1", params![song_id])?;
        self.conn.execute(
            "INSERT INTO song_artist (artist_id, song_id, role, sort_order, artist_name)
             VALUES (?1, ?2, 'artist', 0, ?3)",
            params![artist_id, song_id, artist_name],
        )?;
        Ok(())
    }

    pub fn song_artists(&self, song_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT artist_id FROM song_artist WHERE song_id = ?1")?;
        let ids = stmt
            .query_map(params![song_id], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    pub fn clear_album_artists(&self, album_id: i64) -> Result<Vec<i64>> {
        let ids = {
            let mut stmt = self
                .conn
                .prepare_cached("SELECT artist_id FROM album_artist WHERE album_id = ?1")?;
            let rows = stmt
                .query_map(params![album_id], |r| r.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            rows
        };
        self.conn
            .execute("DELETE FROM album_artist WHERE album_id = ?1", params![album_id])?;
        Ok(ids)
    }

    pub fn clear_song_artists(&self, song_id: i64) -> Result<Vec<i64>> {
        let ids = self.song_artists(song_id)?;
        self.conn
            .execute("DELETE FROM song_artist WHERE song_id = ?1", params![song_id])?;
        Ok(ids)
    }

    /// Whether any album or song still credits the artist.
    pub fn artist_has_links(&self, artist_id: i64) -> Result<bool> {
        Ok(self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM album_artist WHERE artist_id = ?1)
                 OR EXISTS (SELECT 1 FROM song_artist WHERE artist_id = ?1)",
            params![artist_id],
            |r| r.get(0),
        )?)
    }

    pub fn albums_credited_to(&self, artist_id: i64) -> Result<Vec<i64>> {
        self.children(LocalKind::Album, artist_id)
    }
}
