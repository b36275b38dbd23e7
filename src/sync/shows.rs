//! Series, seasons and episodes.

use super::context::UpsertContext;
use super::engine::{SyncSession, Target, UpsertOutcome};
use super::error::SyncError;
use super::hierarchy::{placeholder_show, resolve_parent, season_for};
use super::paths::{file_location, show_folder, Section};
use super::removal::{collect_season, collect_show, purge_record};
use super::video::{
    names, playstate, video_tags, write_row, write_video_metadata, RATING_DEFAULT,
};
use super::KindSync;
use crate::catalog::{join_list, CatalogItem, Provider};
use crate::library::{replace_art, EpisodeRow, LocalKind, SeasonRow, TvShowRow};
use crate::reconcile::AssociationKind;
use anyhow::anyhow;
use tracing::{debug, info};

// =============================================================================
// Series
// =============================================================================

pub(crate) struct ShowSync;

impl KindSync for ShowSync {
    fn upsert(
        &self,
        s: &SyncSession<'_>,
        item: &CatalogItem,
        ctx: &UpsertContext,
        target: Target,
    ) -> Result<UpsertOutcome, SyncError> {
        let id = target.local_id;
        let (title, sort_title) = item.titles();
        let genres = item.genre_list();

        let (top_level, folder) = show_folder(item, s.settings);
        let top_id = s.library.add_path(&top_level, Some("tvshows"), None)?;
        let path_id = s.library.add_path(&folder, None, Some(top_id))?;

        let row = TvShowRow {
            path_id: Some(path_id),
            title,
            sort_title,
            plot: item.plot(),
            premiered: item.premiere_date(),
            content_rating: item.content_rating(),
            genre: join_list(&genres),
            studio: item.studios().first().cloned(),
        };
        write_row(s, &target, &row)?;
        if target.needs_insert() {
            info!("Added series {} '{}'", id, row.title);
        } else {
            info!("Updated series {} '{}'", id, row.title);
        }

        let old_paths = s.library.unlink_show_paths(id)?;
        s.library.link_show_path(id, path_id)?;
        for old in old_paths.into_iter().filter(|p| *p != path_id) {
            s.library.remove_path_if_orphan(old)?;
        }

        match item.provider(Provider::Tvdb) {
            Some(tvdb) => s.library.set_uniqueid(id, LocalKind::TvShow, "unknown", &tvdb)?,
            None => {
                s.library.remove_uniqueids(id, LocalKind::TvShow)?;
            }
        }
        s.library.upsert_rating(
            id,
            LocalKind::TvShow,
            RATING_DEFAULT,
            item.audience_rating(),
            None,
        )?;

        write_video_metadata(
            s,
            item,
            LocalKind::TvShow,
            id,
            &[
                (AssociationKind::Genre, genres),
                (AssociationKind::Studio, item.studios()),
                (AssociationKind::Tag, video_tags(item, ctx)),
            ],
            &item.cast(),
        )?;

        s.record_mapping(item, ctx, LocalKind::TvShow, &target, None, Some(path_id), None)?;
        Ok(target.outcome)
    }

    fn remove(&self, s: &SyncSession<'_>, local_id: i64) -> Result<(), SyncError> {
        self.remove_children(s, local_id)?;
        purge_record(s, LocalKind::TvShow, local_id)
    }

    fn remove_children(&self, s: &SyncSession<'_>, local_id: i64) -> Result<usize, SyncError> {
        let mut removed = 0;
        for season_id in s.library.children(LocalKind::Season, local_id)? {
            removed += purge_episodes(s, season_id)?;
            purge_record(s, LocalKind::Season, season_id)?;
            removed += 1;
        }
        for episode_id in s.library.episodes_of_show(local_id)? {
            purge_record(s, LocalKind::Episode, episode_id)?;
            removed += 1;
        }
        Ok(removed)
    }
}

fn purge_episodes(s: &SyncSession<'_>, season_id: i64) -> Result<usize, SyncError> {
    let episodes = s.library.children(LocalKind::Episode, season_id)?;
    for episode_id in &episodes {
        purge_record(s, LocalKind::Episode, *episode_id)?;
    }
    Ok(episodes.len())
}

// =============================================================================
// Seasons
// =============================================================================

pub(crate) struct SeasonSync;

impl KindSync for SeasonSync {
    fn upsert(
        &self,
        s: &SyncSession<'_>,
        item: &CatalogItem,
        ctx: &UpsertContext,
        mut target: Target,
    ) -> Result<UpsertOutcome, SyncError> {
        let remote_id = item.remote_id().unwrap_or_default();
        let show_id = match item.parent_id() {
            Some(show_ref) => resolve_parent(s, show_ref, LocalKind::TvShow, ctx)?,
            None => placeholder_show(s, item.parent_title(), remote_id)?,
        };
        let number = item.index_or_missing();

        // A placeholder created for an earlier episode becomes this season.
        if target.needs_insert() {
            if let Some(existing) = s.library.find_season(show_id, number)? {
                s.adopt(LocalKind::Season, existing)?;
                target.local_id = existing;
                target.outcome = UpsertOutcome::Updated;
            }
        }

        let row = SeasonRow {
            show_id,
            season: number,
            name: item.title.clone(),
        };
        write_row(s, &target, &row)?;
        debug!(
            "Synced season {} of series {} ({})",
            number, show_id, target.local_id
        );

        replace_art(
            s.conn(),
            target.local_id,
            LocalKind::Season.to_db_str(),
            &item.artwork(),
            s.artwork,
        )?;
        s.record_mapping(item, ctx, LocalKind::Season, &target, None, None, Some(show_id))?;
        Ok(target.outcome)
    }

    fn remove(&self, s: &SyncSession<'_>, local_id: i64) -> Result<(), SyncError> {
        let show_id = s.library.season_show(local_id)?;
        purge_episodes(s, local_id)?;
        purge_record(s, LocalKind::Season, local_id)?;
        if let Some(show_id) = show_id {
            collect_show(s, show_id)?;
        }
        Ok(())
    }

    fn remove_children(&self, s: &SyncSession<'_>, local_id: i64) -> Result<usize, SyncError> {
        purge_episodes(s, local_id)
    }
}

// =============================================================================
// Episodes
// =============================================================================

pub(crate) struct EpisodeSync;

/// `(show_id, season_id)` of an episode. Without a season reference the
/// season is looked up, or created, by number under the series.
fn episode_parents(
    s: &SyncSession<'_>,
    item: &CatalogItem,
    ctx: &UpsertContext,
) -> Result<(i64, i64), SyncError> {
    let remote_id = item.remote_id().unwrap_or_default();
    if let Some(season_ref) = item.parent_id() {
        let season_id = resolve_parent(s, season_ref, LocalKind::Season, ctx)?;
        let show_id = s.library.season_show(season_id)?.ok_or_else(|| {
            SyncError::Store(anyhow!("season {} has no series", season_id))
        })?;
        return Ok((show_id, season_id));
    }
    let show_id = match item.grandparent_id() {
        Some(show_ref) => resolve_parent(s, show_ref, LocalKind::TvShow, ctx)?,
        None => placeholder_show(s, item.grandparent_title(), remote_id)?,
    };
    let season_id = season_for(s, show_id, item.parent_index_or_missing())?;
    Ok((show_id, season_id))
}

impl KindSync for EpisodeSync {
    fn upsert(
        &self,
        s: &SyncSession<'_>,
        item: &CatalogItem,
        ctx: &UpsertContext,
        target: Target,
    ) -> Result<UpsertOutcome, SyncError> {
        let id = target.local_id;
        let settings = s.settings;
        let (show_id, season_id) = episode_parents(s, item, ctx)?;
        let (title, _) = item.titles();
        let (_, runtime) = item.resume_runtime(settings.time_factor);
        let cast = item.cast();

        let location = file_location(item, settings, Section::TvShows, "episode");
        let path_id = s.library.add_path(&location.dir, None, None)?;
        let file_id = s.library.add_file(
            path_id,
            &location.filename,
            Some(&item.date_added(settings.time_offset_secs)),
        )?;

        let row = EpisodeRow {
            file_id: Some(file_id),
            path_id: Some(path_id),
            show_id,
            season_id,
            title,
            plot: item.plot(),
            writer: join_list(&names(&cast.writers)),
            director: join_list(&names(&cast.directors)),
            premiered: item.premiere_date(),
            runtime: Some(runtime),
            season_number: item.parent_index_or_missing(),
            episode_number: item.index_or_missing(),
            play_url: Some(location.play_url.clone()),
            user_rating: Some(item.user_rating()),
        };
        write_row(s, &target, &row)?;
        // Only once the record points at the new file can the old path go
        s.replace_file(&target, file_id)?;
        info!(
            "{} episode {} '{}' (S{}E{}) of series {}",
            if target.needs_insert() { "Added" } else { "Updated" },
            id,
            row.title,
            row.season_number,
            row.episode_number,
            show_id
        );

        match item.provider(Provider::Tvdb) {
            Some(tvdb) => s.library.set_uniqueid(id, LocalKind::Episode, "tvdb", &tvdb)?,
            None => {
                s.library.remove_uniqueids(id, LocalKind::Episode)?;
            }
        }
        s.library.upsert_rating(
            id,
            LocalKind::Episode,
            RATING_DEFAULT,
            item.audience_rating(),
            None,
        )?;
        s.library
            .replace_streams(file_id, &item.stream_details(settings.time_factor))?;
        s.library.set_playstate(file_id, &playstate(item, s))?;

        write_video_metadata(s, item, LocalKind::Episode, id, &[], &cast)?;

        s.record_mapping(
            item,
            ctx,
            LocalKind::Episode,
            &target,
            Some(file_id),
            Some(path_id),
            Some(season_id),
        )?;
        Ok(target.outcome)
    }

    fn remove(&self, s: &SyncSession<'_>, local_id: i64) -> Result<(), SyncError> {
        let parents = s.library.episode_parents(local_id)?;
        purge_record(s, LocalKind::Episode, local_id)?;
        if let Some((_, season_id)) = parents {
            collect_season(s, season_id)?;
        }
        Ok(())
    }
}
