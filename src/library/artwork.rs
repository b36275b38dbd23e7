//! Artwork rows and the external thumbnail cache they feed.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::debug;

/// External cache of downloaded artwork. Whenever an artwork url stops being
/// referenced by the library it is evicted.
pub trait ArtworkCache: Send + Sync {
    fn evict(&self, url: &str);
}

pub struct NoopArtworkCache;

impl ArtworkCache for NoopArtworkCache {
    fn evict(&self, _url: &str) {}
}

/// Remembers evicted urls, for callers that report or inspect evictions.
#[derive(Default)]
pub struct RecordingArtworkCache {
    evicted: Mutex<HashSet<String>>,
}

impl RecordingArtworkCache {
    pub fn evicted(&self) -> Vec<String> {
        let mut urls: Vec<String> = match self.evicted.lock() {
            Ok(guard) => guard.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        };
        urls.sort();
        urls
    }
}

impl ArtworkCache for RecordingArtworkCache {
    fn evict(&self, url: &str) {
        let mut guard = match self.evicted.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.insert(url.to_string());
    }
}

/// Sets the artwork of one item. `art` holds `(type, url)` pairs; a `None`
/// url removes that type. Replaced urls are evicted from the cache.
pub fn replace_art(
    conn: &Connection,
    media_id: i64,
    media_type: &str,
    art: &[(&str, Option<&str>)],
    cache: &dyn ArtworkCache,
) -> Result<()> {
    for (art_type, url) in art {
        let current: Option<String> = conn
            .query_row(
                "SELECT url FROM art WHERE media_id = ?1 AND media_type = ?2 AND type = ?3",
                params![media_id, media_type, art_type],
                |r| r.get(0),
            )
            .optional()?;

        match (current.as_deref(), url) {
            (Some(old), Some(new)) if old == *new => {}
            (Some(old), Some(new)) => {
                conn.execute(
                    "UPDATE art SET url = ?1 WHERE media_id = ?2 AND media_type = ?3 AND type = ?4",
                    params![new, media_id, media_type, art_type],
                )?;
                debug!("Replaced {} art of {} {}", art_type, media_type, media_id);
                cache.evict(old);
            }
            (None, Some(new)) => {
                conn.execute(
                    "INSERT INTO art (media_id, media_type, type, url) VALUES (?1, ?2, ?3, ?4)",
                    params![media_id, media_type, art_type, new],
                )?;
            }
            (Some(old), None) => {
                conn.execute(
                    "DELETE FROM art WHERE media_id = ?1 AND media_type = ?2 AND type = ?3",
                    params![media_id, media_type, art_type],
                )?;
                cache.evict(old);
            }
            (None, None) => {}
        }
    }
    Ok(())
}

/// Deletes all artwork of one item and evicts it from the cache.
pub fn delete_art(
    conn: &Connection,
    media_id: i64,
    media_type: &str,
    cache: &dyn ArtworkCache,
) -> Result<usize> {
    let urls: Vec<String> = {
        let mut stmt = conn
            .prepare_cached("SELECT url FROM art WHERE media_id = ?1 AND media_type = ?2")?;
        let rows = stmt
            .query_map(params![media_id, media_type], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows
    };
    conn.execute(
        "DELETE FROM art WHERE media_id = ?1 AND media_type = ?2",
        params![media_id, media_type],
    )?;
    for url in &urls {
        cache.evict(url);
    }
    Ok(urls.len())
}
