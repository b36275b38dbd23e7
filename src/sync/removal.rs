//! Removal of mirrored items and collection of the ancestors they leave
//! empty.
//!
//! A parent is only ever collected as the result of a deletion; syncing
//! never removes a childless parent on its own.

use super::engine::SyncSession;
use super::error::SyncError;
use super::kind_sync;
use crate::library::{delete_art, LocalKind};
use crate::reconcile::{detach_all, detach_people};
use tracing::{debug, info};

pub(crate) fn remove(s: &SyncSession<'_>, remote_id: &str) -> Result<bool, SyncError> {
    let Some(mapping) = s.identity.lookup(remote_id)? else {
        debug!("Item {} is not mirrored, nothing to remove", remote_id);
        return Ok(false);
    };
    let (kind, local_id) = (mapping.local_kind, mapping.local_id);
    s.identity.delete_mapping(remote_id)?;

    let others = s
        .identity
        .by_local(local_id, kind)?
        .into_iter()
        .filter(|m| !m.is_synthetic())
        .count();
    if others > 0 {
        info!(
            "Unmapped item {}; {} {} is still mirrored by {} other item(s)",
            remote_id, kind, local_id, others
        );
        return Ok(true);
    }

    if !s.library.exists(kind, local_id)? {
        debug!("{} {} of item {} was already gone", kind, local_id, remote_id);
        s.identity.delete_by_local(local_id, kind)?;
        return Ok(true);
    }

    kind_sync(kind).remove(s, local_id)?;
    info!("Removed item {} ({} {})", remote_id, kind, local_id);
    Ok(true)
}

pub(crate) fn remove_children(s: &SyncSession<'_>, remote_id: &str) -> Result<usize, SyncError> {
    let Some(mapping) = s.identity.lookup(remote_id)? else {
        debug!("Item {} is not mirrored, nothing to remove", remote_id);
        return Ok(0);
    };
    let removed = kind_sync(mapping.local_kind).remove_children(s, mapping.local_id)?;
    info!(
        "Removed {} children of item {} ({} {})",
        removed, remote_id, mapping.local_kind, mapping.local_id
    );
    Ok(removed)
}

/// Deletes one record with everything hanging off it: associations, people,
/// artwork, provider ids, ratings, its file and every mapping pointing at it.
/// Children and parents are left alone.
pub(crate) fn purge_record(s: &SyncSession<'_>, kind: LocalKind, id: i64) -> Result<(), SyncError> {
    let conn = s.conn();
    let (file_id, path_id) = s.library.file_refs(kind, id)?;

    detach_all(conn, id, kind)?;
    detach_people(conn, id, kind, s.artwork)?;
    delete_art(conn, id, kind.to_db_str(), s.artwork)?;
    s.library.remove_uniqueids(id, kind)?;
    s.library.remove_ratings(id, kind)?;

    let mut paths: Vec<i64> = path_id.into_iter().collect();
    match kind {
        LocalKind::TvShow => paths.extend(s.library.unlink_show_paths(id)?),
        LocalKind::Album => {
            s.library.clear_album_artists(id)?;
        }
        LocalKind::Song => {
            s.library.clear_song_artists(id)?;
        }
        _ => {}
    }

    s.library.delete_entity(kind, id)?;
    if let Some(file_id) = file_id {
        s.library.remove_file(file_id)?;
    }
    for path_id in paths {
        s.library.remove_path_if_orphan(path_id)?;
    }
    let mappings = s.identity.delete_by_local(id, kind)?;
    debug!("Purged {} {} and {} mapping(s)", kind, id, mappings);
    Ok(())
}

// =============================================================================
// Ancestor collection
// =============================================================================

/// Deletes a set no movie belongs to anymore.
pub(crate) fn collect_set(s: &SyncSession<'_>, set_id: i64) -> Result<bool, SyncError> {
    if !s.library.exists(LocalKind::Set, set_id)?
        || !s.library.children(LocalKind::Movie, set_id)?.is_empty()
    {
        return Ok(false);
    }
    purge_record(s, LocalKind::Set, set_id)?;
    info!("Collected empty set {}", set_id);
    Ok(true)
}

/// Deletes a season without episodes, then its series if that became empty.
pub(crate) fn collect_season(s: &SyncSession<'_>, season_id: i64) -> Result<bool, SyncError> {
    if !s.library.exists(LocalKind::Season, season_id)?
        || !s.library.children(LocalKind::Episode, season_id)?.is_empty()
    {
        return Ok(false);
    }
    let show_id = s.library.season_show(season_id)?;
    purge_record(s, LocalKind::Season, season_id)?;
    info!("Collected empty season {}", season_id);
    if let Some(show_id) = show_id {
        collect_show(s, show_id)?;
    }
    Ok(true)
}

/// Deletes a series without seasons and episodes.
pub(crate) fn collect_show(s: &SyncSession<'_>, show_id: i64) -> Result<bool, SyncError> {
    if !s.library.exists(LocalKind::TvShow, show_id)?
        || !s.library.children(LocalKind::Season, show_id)?.is_empty()
        || !s.library.episodes_of_show(show_id)?.is_empty()
    {
        return Ok(false);
    }
    purge_record(s, LocalKind::TvShow, show_id)?;
    info!("Collected empty series {}", show_id);
    Ok(true)
}

/// Deletes an album without tracks, then the artists it leaves uncredited.
pub(crate) fn collect_album(s: &SyncSession<'_>, album_id: i64) -> Result<bool, SyncError> {
    if !s.library.exists(LocalKind::Album, album_id)?
        || !s.library.children(LocalKind::Song, album_id)?.is_empty()
    {
        return Ok(false);
    }
    let artists = s.library.clear_album_artists(album_id)?;
    purge_record(s, LocalKind::Album, album_id)?;
    info!("Collected empty album {}", album_id);
    for artist_id in artists {
        collect_artist(s, artist_id)?;
    }
    Ok(true)
}

/// Deletes an artist no album or track credits anymore.
pub(crate) fn collect_artist(s: &SyncSession<'_>, artist_id: i64) -> Result<bool, SyncError> {
    if !s.library.exists(LocalKind::Artist, artist_id)? || s.library.artist_has_links(artist_id)? {
        return Ok(false);
    }
    purge_record(s, LocalKind::Artist, artist_id)?;
    info!("Collected artist {} without albums", artist_id);
    Ok(true)
}
