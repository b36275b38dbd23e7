//! Movies and movie collections.

use super::context::UpsertContext;
use super::engine::{SyncSession, Target, UpsertOutcome};
use super::error::SyncError;
use super::paths::{file_location, Section};
use super::removal::{collect_set, purge_record};
use super::KindSync;
use crate::catalog::{join_list, CatalogItem, Provider};
use crate::library::{
    insert_row, replace_art, update_row, EntityRow, LocalKind, MovieRow, Playstate, SetRow,
};
use crate::reconcile::{reconcile, reconcile_people, AssociationKind, Cast, Person};
use tracing::{debug, info};

pub(crate) const RATING_DEFAULT: &str = "default";

pub(crate) fn names(people: &[Person]) -> Vec<String> {
    people.iter().map(|p| p.name.clone()).collect()
}

/// Inserts or updates the record row depending on the target.
pub(crate) fn write_row<R: EntityRow>(
    s: &SyncSession<'_>,
    target: &Target,
    row: &R,
) -> Result<(), SyncError> {
    if target.needs_insert() {
        insert_row(s.conn(), target.local_id, row)?;
    } else {
        update_row(s.conn(), target.local_id, row)?;
    }
    Ok(())
}

/// Tag set of a video item: the library section name, then its collections.
pub(crate) fn video_tags(item: &CatalogItem, ctx: &UpsertContext) -> Vec<String> {
    ctx.view_tag
        .iter()
        .cloned()
        .chain(item.collection_list())
        .collect()
}

/// Reconciles the given associations, the cast, and the artwork of one
/// video record.
pub(crate) fn write_video_metadata(
    s: &SyncSession<'_>,
    item: &CatalogItem,
    kind: LocalKind,
    id: i64,
    associations: &[(AssociationKind, Vec<String>)],
    cast: &Cast,
) -> Result<(), SyncError> {
    let conn = s.conn();
    for (assoc, values) in associations {
        let changes = reconcile(conn, id, kind, *assoc, values)?;
        if !changes.is_empty() {
            debug!("{:?} of {} {}: {:?}", assoc, kind, id, changes);
        }
    }
    reconcile_people(conn, id, kind, cast, s.artwork)?;
    replace_art(conn, id, kind.to_db_str(), &item.artwork(), s.artwork)?;
    Ok(())
}

/// Play counters and resume point of a file, from the item's user data.
pub(crate) fn playstate(item: &CatalogItem, s: &SyncSession<'_>) -> Playstate {
    let (resume_seconds, total_seconds) = item.resume_runtime(s.settings.time_factor);
    Playstate {
        resume_seconds,
        total_seconds,
        play_count: item.play_count(),
        last_played: item.last_played(s.settings.time_offset_secs),
    }
}

// =============================================================================
// Movies
// =============================================================================

pub(crate) struct MovieSync;

impl KindSync for MovieSync {
    fn upsert(
        &self,
        s: &SyncSession<'_>,
        item: &CatalogItem,
        ctx: &UpsertContext,
        target: Target,
    ) -> Result<UpsertOutcome, SyncError> {
        let id = target.local_id;
        let settings = s.settings;
        let (title, sort_title) = item.titles();
        let (_, runtime) = item.resume_runtime(settings.time_factor);
        let cast = item.cast();
        let genres = item.genre_list();
        let countries = item.country_list();
        let studios = item.studios();

        let location = file_location(item, settings, Section::Movies, "movie");
        let path_id = s.library.add_path(&location.dir, Some("movies"), None)?;
        let file_id = s.library.add_file(
            path_id,
            &location.filename,
            Some(&item.date_added(settings.time_offset_secs)),
        )?;

        let row = MovieRow {
            file_id: Some(file_id),
            path_id: Some(path_id),
            title,
            sort_title,
            plot: item.plot(),
            tagline: item.tagline.clone(),
            year: item.year(),
            premiered: item.premiere_date(),
            runtime: Some(runtime),
            content_rating: item.content_rating(),
            genre: join_list(&genres),
            writer: join_list(&names(&cast.writers)),
            director: join_list(&names(&cast.directors)),
            studio: studios.first().cloned(),
            country: join_list(&countries),
            play_url: Some(location.play_url.clone()),
            user_rating: Some(item.user_rating()),
        };
        write_row(s, &target, &row)?;
        // Only once the record points at the new file can the old path go
        s.replace_file(&target, file_id)?;
        info!(
            "{} movie {} '{}' (item {})",
            if target.needs_insert() { "Added" } else { "Updated" },
            id,
            row.title,
            item.remote_id().unwrap_or_default()
        );

        match item.provider(Provider::Imdb) {
            Some(imdb) => s.library.set_uniqueid(id, LocalKind::Movie, "imdb", &imdb)?,
            None => {
                s.library.remove_uniqueids(id, LocalKind::Movie)?;
            }
        }
        s.library.upsert_rating(
            id,
            LocalKind::Movie,
            RATING_DEFAULT,
            item.audience_rating(),
            None,
        )?;
        s.library
            .replace_streams(file_id, &item.stream_details(settings.time_factor))?;
        s.library.set_playstate(file_id, &playstate(item, s))?;

        write_video_metadata(
            s,
            item,
            LocalKind::Movie,
            id,
            &[
                (AssociationKind::Genre, genres),
                (AssociationKind::Studio, studios),
                (AssociationKind::Country, countries),
                (AssociationKind::Tag, video_tags(item, ctx)),
            ],
            &cast,
        )?;

        let set_id = assign_set(s, id, &item.collection_list())?;
        s.record_mapping(
            item,
            ctx,
            LocalKind::Movie,
            &target,
            Some(file_id),
            Some(path_id),
            set_id,
        )?;
        Ok(target.outcome)
    }

    fn remove(&self, s: &SyncSession<'_>, local_id: i64) -> Result<(), SyncError> {
        let set_id = s.library.movie_set(local_id)?;
        purge_record(s, LocalKind::Movie, local_id)?;
        if let Some(set_id) = set_id {
            collect_set(s, set_id)?;
        }
        Ok(())
    }
}

/// Puts the movie into the set of its first collection, or into none, and
/// collects the set it leaves behind.
fn assign_set(
    s: &SyncSession<'_>,
    movie_id: i64,
    collections: &[String],
) -> Result<Option<i64>, SyncError> {
    let previous = s.library.movie_set(movie_id)?;
    let set_id = match collections.first() {
        Some(name) => Some(s.set_for(name)?),
        None => None,
    };
    if previous != set_id {
        s.library.assign_set(movie_id, set_id)?;
        if let Some(previous) = previous {
            collect_set(s, previous)?;
        }
    }
    Ok(set_id)
}

// =============================================================================
// Collections
// =============================================================================

/// A remote collection is a movie set. Movies tagged with the collection's
/// name share the same set row.
pub(crate) struct CollectionSync;

impl KindSync for CollectionSync {
    fn upsert(
        &self,
        s: &SyncSession<'_>,
        item: &CatalogItem,
        ctx: &UpsertContext,
        mut target: Target,
    ) -> Result<UpsertOutcome, SyncError> {
        let (title, _) = item.titles();
        if target.needs_insert() {
            let set_id = s.set_for(&title)?;
            s.adopt(LocalKind::Set, set_id)?;
            target.local_id = set_id;
            s.library
                .update_set_overview(set_id, item.summary.as_deref())?;
        } else {
            let row = SetRow {
                name: title.clone(),
                overview: item.summary.clone(),
            };
            write_row(s, &target, &row)?;
        }
        replace_art(
            s.conn(),
            target.local_id,
            LocalKind::Set.to_db_str(),
            &item.artwork(),
            s.artwork,
        )?;
        info!("Synced set {} '{}'", target.local_id, title);
        s.record_mapping(item, ctx, LocalKind::Set, &target, None, None, None)?;
        Ok(target.outcome)
    }

    fn remove(&self, s: &SyncSession<'_>, local_id: i64) -> Result<(), SyncError> {
        self.remove_children(s, local_id)?;
        purge_record(s, LocalKind::Set, local_id)
    }

    /// Detaches the set's movies; the movies themselves stay.
    fn remove_children(&self, s: &SyncSession<'_>, local_id: i64) -> Result<usize, SyncError> {
        for mapping in s.identity.children_of(local_id, LocalKind::Movie)? {
            s.identity.update_parent(&mapping.remote_id, None)?;
        }
        let detached = s.library.detach_set(local_id)?;
        debug!("Detached {} movie(s) from set {}", detached, local_id);
        Ok(detached)
    }
}
