//! Artists, albums and tracks.
//!
//! The remote catalog credits exactly one artist per album and track; the
//! local store keeps that single credit in `album_artist` and `song_artist`.

use super::context::{AlbumContext, UpsertContext};
use super::engine::{SyncSession, Target, UpsertOutcome};
use super::error::SyncError;
use super::hierarchy::{artist_by_name, placeholder_album, resolve_parent};
use super::paths::{file_location, Section};
use super::removal::{collect_album, collect_artist, purge_record};
use super::video::write_row;
use super::KindSync;
use crate::catalog::{join_list, CatalogItem};
use crate::library::{replace_art, AlbumRow, ArtistRow, LocalKind, SongRow, RELEASE_TYPE_ALBUM};
use crate::reconcile::{reconcile, AssociationKind};
use chrono::Utc;
use tracing::{debug, info, warn};

fn now() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn write_genres_and_art(
    s: &SyncSession<'_>,
    item: &CatalogItem,
    kind: LocalKind,
    id: i64,
    genres: &[String],
) -> Result<(), SyncError> {
    reconcile(s.conn(), id, kind, AssociationKind::Genre, genres)?;
    replace_art(s.conn(), id, kind.to_db_str(), &item.artwork(), s.artwork)?;
    Ok(())
}

// =============================================================================
// Artists
// =============================================================================

pub(crate) struct ArtistSync;

impl KindSync for ArtistSync {
    fn upsert(
        &self,
        s: &SyncSession<'_>,
        item: &CatalogItem,
        ctx: &UpsertContext,
        mut target: Target,
    ) -> Result<UpsertOutcome, SyncError> {
        let (name, _) = item.titles();

        // The server can list one artist several times; locally they merge.
        if target.needs_insert() {
            if let Some(existing) = s.library.find_artist_by_name(&name)? {
                if existing != target.local_id {
                    debug!("Merging artist '{}' into {}", name, existing);
                    s.adopt(LocalKind::Artist, existing)?;
                    target.local_id = existing;
                    target.outcome = UpsertOutcome::Updated;
                }
            }
        }

        let genres = item.genre_list();
        let row = ArtistRow {
            name,
            genres: join_list(&genres),
            biography: item.plot(),
            image: item.thumb.clone(),
            fanart: item.art.clone(),
            last_scraped: Some(now()),
        };
        write_row(s, &target, &row)?;
        info!("Synced artist {} '{}'", target.local_id, row.name);

        write_genres_and_art(s, item, LocalKind::Artist, target.local_id, &genres)?;
        s.record_mapping(item, ctx, LocalKind::Artist, &target, None, None, None)?;
        Ok(target.outcome)
    }

    fn remove(&self, s: &SyncSession<'_>, local_id: i64) -> Result<(), SyncError> {
        remove_albums(s, local_id)?;
        purge_record(s, LocalKind::Artist, local_id)
    }

    /// Removes the artist's albums and keeps the artist.
    fn remove_children(&self, s: &SyncSession<'_>, local_id: i64) -> Result<usize, SyncError> {
        remove_albums(s, local_id)
    }
}

fn remove_albums(s: &SyncSession<'_>, artist_id: i64) -> Result<usize, SyncError> {
    let albums = s.library.albums_credited_to(artist_id)?;
    let mut removed = 0;
    for album_id in &albums {
        for other in purge_album(s, *album_id)? {
            if other != artist_id {
                collect_artist(s, other)?;
            }
        }
        removed += 1;
    }
    Ok(removed)
}

/// Purges an album with its tracks. Returns every artist the album or its
/// tracks credited.
fn purge_album(s: &SyncSession<'_>, album_id: i64) -> Result<Vec<i64>, SyncError> {
    let mut artists = purge_tracks(s, album_id)?;
    artists.extend(s.library.clear_album_artists(album_id)?);
    purge_record(s, LocalKind::Album, album_id)?;
    artists.sort_unstable();
    artists.dedup();
    Ok(artists)
}

fn purge_tracks(s: &SyncSession<'_>, album_id: i64) -> Result<Vec<i64>, SyncError> {
    let mut artists = Vec::new();
    for song_id in s.library.children(LocalKind::Song, album_id)? {
        artists.extend(s.library.song_artists(song_id)?);
        purge_record(s, LocalKind::Song, song_id)?;
    }
    Ok(artists)
}

// =============================================================================
// Albums
// =============================================================================

pub(crate) struct AlbumSync;

impl AlbumSync {
    fn children(s: &SyncSession<'_>, item: &CatalogItem, remote_id: &str) -> Vec<CatalogItem> {
        if !item.children.is_empty() {
            return item.children.clone();
        }
        match s.source.fetch_children(remote_id) {
            Ok(children) => children,
            Err(e) => {
                warn!("Could not fetch tracks of album {}: {}", remote_id, e);
                Vec::new()
            }
        }
    }
}

impl KindSync for AlbumSync {
    fn upsert(
        &self,
        s: &SyncSession<'_>,
        item: &CatalogItem,
        ctx: &UpsertContext,
        target: Target,
    ) -> Result<UpsertOutcome, SyncError> {
        let id = target.local_id;
        let remote_id = item.remote_id().unwrap_or_default();
        let artist_name = item
            .parent_title()
            .or_else(|| item.original_title())
            .map(str::to_string);
        let artist_id = match item.parent_id() {
            Some(artist_ref) => resolve_parent(s, artist_ref, LocalKind::Artist, ctx)?,
            None => artist_by_name(s, artist_name.as_deref())?,
        };

        let children = Self::children(s, item, remote_id);
        let compilation = children.iter().any(|c| c.original_title().is_some());
        let genres = item.genre_list();

        let (title, _) = item.titles();
        let row = AlbumRow {
            title: Some(title),
            artists: artist_name.clone(),
            year: item.year(),
            genres: join_list(&genres),
            review: item.plot(),
            image: item.thumb.clone(),
            user_rating: Some(item.user_rating()),
            last_scraped: Some(now()),
            release_type: RELEASE_TYPE_ALBUM.to_string(),
            label: item.label(),
            compilation,
        };
        write_row(s, &target, &row)?;
        info!(
            "{} album {} '{}' ({} tracks listed)",
            if target.needs_insert() { "Added" } else { "Updated" },
            id,
            row.title.as_deref().unwrap_or_default(),
            children.len()
        );

        // The album's view of the artist name wins over the artist's own.
        let credited = match &artist_name {
            Some(name) => {
                s.library.rename_artist(artist_id, name)?;
                name.clone()
            }
            None => s.library.artist_name(artist_id)?.unwrap_or_default(),
        };
        let previous_artists = s.library.clear_album_artists(id)?;
        s.library.set_album_artist(id, artist_id, &credited)?;

        write_genres_and_art(s, item, LocalKind::Album, id, &genres)?;
        s.record_mapping(item, ctx, LocalKind::Album, &target, None, None, Some(artist_id))?;

        for previous in previous_artists.into_iter().filter(|a| *a != artist_id) {
            collect_artist(s, previous)?;
        }

        if ctx.scan_children {
            let track_ctx = ctx.for_track(AlbumContext {
                genres,
                compilation,
            });
            for child in &children {
                if let Err(e) = s.savepoint("sync_track", |s| s.upsert(child, &track_ctx)) {
                    warn!(
                        "Track {} of album {} not synced: {:#}",
                        child.remote_id().unwrap_or("?"),
                        remote_id,
                        e
                    );
                }
            }
        }
        Ok(target.outcome)
    }

    fn remove(&self, s: &SyncSession<'_>, local_id: i64) -> Result<(), SyncError> {
        for artist_id in purge_album(s, local_id)? {
            collect_artist(s, artist_id)?;
        }
        Ok(())
    }

    fn remove_children(&self, s: &SyncSession<'_>, local_id: i64) -> Result<usize, SyncError> {
        let tracks = s.library.children(LocalKind::Song, local_id)?.len();
        for artist_id in purge_tracks(s, local_id)? {
            collect_artist(s, artist_id)?;
        }
        Ok(tracks)
    }
}

// =============================================================================
// Tracks
// =============================================================================

pub(crate) struct TrackSync;

impl KindSync for TrackSync {
    fn upsert(
        &self,
        s: &SyncSession<'_>,
        item: &CatalogItem,
        ctx: &UpsertContext,
        target: Target,
    ) -> Result<UpsertOutcome, SyncError> {
        let id = target.local_id;
        let settings = s.settings;
        let remote_id = item.remote_id().unwrap_or_default();
        let (title, _) = item.titles();
        let (_, duration) = item.resume_runtime(settings.time_factor);

        let genres = match &ctx.album {
            Some(album) => album.genres.clone(),
            None => item.genre_list(),
        };
        let artists = match &ctx.album {
            Some(album) if album.compilation => item.original_title(),
            Some(_) => item.grandparent_title(),
            None => item.original_title().or_else(|| item.grandparent_title()),
        }
        .unwrap_or_default()
        .to_string();

        let artist_id = match item.grandparent_id() {
            Some(artist_ref) => resolve_parent(s, artist_ref, LocalKind::Artist, ctx)?,
            None => artist_by_name(s, item.grandparent_title())?,
        };
        let album_id = match item.parent_id() {
            Some(album_ref) => resolve_parent(s, album_ref, LocalKind::Album, ctx)?,
            None => placeholder_album(
                s,
                remote_id,
                item.parent_title(),
                artist_id,
                item.year(),
                &join_list(&genres),
            )?,
        };

        let location = file_location(item, settings, Section::Music, "track");
        let path_id = s.library.add_path(&location.dir, Some("music"), None)?;

        let row = SongRow {
            album_id,
            path_id: Some(path_id),
            artists,
            genres: join_list(&genres),
            title,
            track: item.track_number(),
            duration: Some(duration),
            year: item.year(),
            filename: Some(location.filename.clone()),
            times_played: item.view_count(),
            last_played: item.last_played(settings.time_offset_secs),
            user_rating: Some(item.user_rating()),
            mood: join_list(&item.mood_list()),
        };
        write_row(s, &target, &row)?;
        info!(
            "{} track {} '{}' on album {}",
            if target.needs_insert() { "Added" } else { "Updated" },
            id,
            row.title,
            album_id
        );

        let artist_name = match item.grandparent_title() {
            Some(name) => name.to_string(),
            None => s.library.artist_name(artist_id)?.unwrap_or_default(),
        };
        let previous_artists = s.library.clear_song_artists(id)?;
        s.library.set_song_artist(id, artist_id, &artist_name)?;

        write_genres_and_art(s, item, LocalKind::Song, id, &genres)?;
        if item.parent_id().is_none() {
            replace_art(
                s.conn(),
                album_id,
                LocalKind::Album.to_db_str(),
                &item.artwork(),
                s.artwork,
            )?;
        }

        if let Some(previous) = &target.previous {
            if let Some(old_path) = previous.path_id.filter(|p| *p != path_id) {
                s.library.remove_path_if_orphan(old_path)?;
            }
        }
        s.record_mapping(
            item,
            ctx,
            LocalKind::Song,
            &target,
            None,
            Some(path_id),
            Some(album_id),
        )?;

        for previous in previous_artists.into_iter().filter(|a| *a != artist_id) {
            collect_artist(s, previous)?;
        }
        Ok(target.outcome)
    }

    fn remove(&self, s: &SyncSession<'_>, local_id: i64) -> Result<(), SyncError> {
        let album_id = s.library.song_album(local_id)?;
        let artists = s.library.song_artists(local_id)?;
        purge_record(s, LocalKind::Song, local_id)?;
        if let Some(album_id) = album_id {
            collect_album(s, album_id)?;
        }
        for artist_id in artists {
            collect_artist(s, artist_id)?;
        }
        Ok(())
    }
}
