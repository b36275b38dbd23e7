//! Parent resolution for seasons, episodes, albums and tracks.
//!
//! A referenced parent that is not mirrored yet is fetched from the catalog
//! source and synced first. When the item carries no reference at all a
//! placeholder parent is created and mapped under a synthetic remote id, so
//! the next child pointing at the same placeholder finds it again.

use super::context::UpsertContext;
use super::engine::SyncSession;
use super::error::SyncError;
use crate::catalog::MISSING_TITLE;
use crate::identity::{synthetic_id, IdentityMapping};
use crate::library::{
    insert_row, AlbumRow, ArtistRow, LocalKind, SeasonRow, TvShowRow, RELEASE_TYPE_ALBUM,
    RELEASE_TYPE_SINGLE,
};
use anyhow::anyhow;
use tracing::info;

pub(crate) const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Local id of the `kind` record mirrored under `parent_remote_id`, syncing
/// the parent first when it is missing locally.
pub(crate) fn resolve_parent(
    s: &SyncSession<'_>,
    parent_remote_id: &str,
    kind: LocalKind,
    ctx: &UpsertContext,
) -> Result<i64, SyncError> {
    if let Some(id) = mapped_record(s, parent_remote_id, kind)? {
        return Ok(id);
    }

    if ctx.is_resolving(parent_remote_id) {
        return Err(SyncError::ParentCycle(parent_remote_id.to_string()));
    }

    let parent = s
        .source
        .fetch_item(parent_remote_id)
        .map_err(|source| SyncError::ParentUnavailable {
            remote_id: parent_remote_id.to_string(),
            source,
        })?;
    let found = parent.item_kind().map(|k| k.local_kind());
    if found != Some(kind) {
        return Err(SyncError::ParentKindMismatch {
            remote_id: parent_remote_id.to_string(),
            expected: kind,
            found: parent.kind.clone().unwrap_or_default(),
        });
    }
    info!("Syncing missing parent {} {}", kind, parent_remote_id);
    s.upsert(&parent, &ctx.for_parent(parent_remote_id))?;

    mapped_record(s, parent_remote_id, kind)?.ok_or_else(|| {
        SyncError::Store(anyhow!(
            "parent {} did not resolve to a local {}",
            parent_remote_id,
            kind
        ))
    })
}

fn mapped_record(
    s: &SyncSession<'_>,
    remote_id: &str,
    kind: LocalKind,
) -> Result<Option<i64>, SyncError> {
    let Some(mapping) = s.identity.lookup(remote_id)? else {
        return Ok(None);
    };
    if mapping.local_kind == kind && s.library.exists(kind, mapping.local_id)? {
        Ok(Some(mapping.local_id))
    } else {
        Ok(None)
    }
}

fn map_placeholder(
    s: &SyncSession<'_>,
    remote_id: String,
    kind: LocalKind,
    local_id: i64,
    parent_local_id: Option<i64>,
) -> Result<(), SyncError> {
    let mut mapping = IdentityMapping::new(remote_id, kind, local_id);
    mapping.parent_local_id = parent_local_id;
    s.identity.upsert_mapping(&mapping)?;
    Ok(())
}

// =============================================================================
// Placeholders
// =============================================================================

/// Series for an episode or season that names no series id. Keyed by the
/// series title when known, else by the child.
pub(crate) fn placeholder_show(
    s: &SyncSession<'_>,
    title: Option<&str>,
    child_remote_id: &str,
) -> Result<i64, SyncError> {
    let key = match title {
        Some(title) => format!("title:{}", title.to_lowercase()),
        None => format!("orphan:{}", child_remote_id),
    };
    let remote_id = synthetic_id(LocalKind::TvShow, &key);
    if let Some(id) = mapped_record(s, &remote_id, LocalKind::TvShow)? {
        return Ok(id);
    }

    let id = s.allocate_id(LocalKind::TvShow)?;
    let title = title.unwrap_or(MISSING_TITLE).to_string();
    let row = TvShowRow {
        sort_title: title.clone(),
        title,
        ..Default::default()
    };
    insert_row(s.conn(), id, &row)?;
    map_placeholder(s, remote_id, LocalKind::TvShow, id, None)?;
    info!(
        "Synthesized series {} '{}' for item {}",
        id, row.title, child_remote_id
    );
    Ok(id)
}

/// Get-or-create season `number` of a series.
pub(crate) fn season_for(s: &SyncSession<'_>, show_id: i64, number: i64) -> Result<i64, SyncError> {
    if let Some(id) = s.library.find_season(show_id, number)? {
        return Ok(id);
    }
    let id = s.allocate_id(LocalKind::Season)?;
    let row = SeasonRow {
        show_id,
        season: number,
        name: None,
    };
    insert_row(s.conn(), id, &row)?;
    map_placeholder(
        s,
        synthetic_id(LocalKind::Season, &format!("{}:{}", show_id, number)),
        LocalKind::Season,
        id,
        Some(show_id),
    )?;
    info!("Synthesized season {} of series {} ({})", number, show_id, id);
    Ok(id)
}

/// Get-or-create an artist by case-insensitive name.
pub(crate) fn artist_by_name(s: &SyncSession<'_>, name: Option<&str>) -> Result<i64, SyncError> {
    let name = name.unwrap_or(UNKNOWN_ARTIST);
    if let Some(id) = s.library.find_artist_by_name(name)? {
        return Ok(id);
    }
    let id = s.allocate_id(LocalKind::Artist)?;
    let row = ArtistRow {
        name: name.to_string(),
        ..Default::default()
    };
    insert_row(s.conn(), id, &row)?;
    map_placeholder(
        s,
        synthetic_id(LocalKind::Artist, &name.to_lowercase()),
        LocalKind::Artist,
        id,
        None,
    )?;
    info!("Synthesized artist {} '{}'", id, name);
    Ok(id)
}

/// Album for a track that names no album id. Titled after the track's album
/// title when known, otherwise a single.
pub(crate) fn placeholder_album(
    s: &SyncSession<'_>,
    track_remote_id: &str,
    album_title: Option<&str>,
    artist_id: i64,
    year: Option<i64>,
    genres: &str,
) -> Result<i64, SyncError> {
    let remote_id = synthetic_id(LocalKind::Album, track_remote_id);
    if let Some(id) = mapped_record(s, &remote_id, LocalKind::Album)? {
        return Ok(id);
    }

    let artist_name = s.library.artist_name(artist_id)?.unwrap_or_default();
    let id = s.allocate_id(LocalKind::Album)?;
    let row = AlbumRow {
        title: album_title.map(str::to_string),
        artists: Some(artist_name.clone()),
        year,
        genres: genres.to_string(),
        release_type: if album_title.is_some() {
            RELEASE_TYPE_ALBUM
        } else {
            RELEASE_TYPE_SINGLE
        }
        .to_string(),
        ..Default::default()
    };
    insert_row(s.conn(), id, &row)?;
    s.library.set_album_artist(id, artist_id, &artist_name)?;
    map_placeholder(s, remote_id, LocalKind::Album, id, Some(artist_id))?;
    info!(
        "Synthesized {} album {} for track {}",
        row.release_type, id, track_remote_id
    );
    Ok(id)
}
