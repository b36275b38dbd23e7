//! End-to-end tests for removals
//!
//! Tests upward collection of emptied parents, downward cascades and
//! association cleanup.

mod common;

use catalog_mirror::catalog::SnapshotSource;
use catalog_mirror::library::LocalKind;
use catalog_mirror::reconcile::AssociationKind;
use common::*;

fn mirrored_show() -> TestMirror {
    let source = SnapshotSource::new(vec![
        show(),
        season(SEASON_1_ID, 1),
        season(SEASON_2_ID, 2),
    ]);
    TestMirror::with_source(source)
}

// =============================================================================
// Series
// =============================================================================

#[test]
fn test_removing_last_episode_removes_season_and_series() {
    let mirror = mirrored_show();
    mirror.upsert(&episode(EPISODE_1_ID, SEASON_1_ID, 1, 1));
    assert_eq!(mirror.mapping_count(), 3);

    assert!(mirror.remove(EPISODE_1_ID));

    assert_eq!(mirror.count("episode"), 0);
    assert_eq!(mirror.count("seasons"), 0);
    assert_eq!(mirror.count("tvshow"), 0);
    assert_eq!(mirror.mapping_count(), 0);
    assert!(mirror.local_id(SHOW_ID).is_none());
    assert!(mirror.local_id(SEASON_1_ID).is_none());
    // Nothing else is left behind
    assert_eq!(mirror.count("files"), 0);
    assert_eq!(mirror.count("path"), 0);
    assert_eq!(mirror.count("genre"), 0);
    assert_eq!(mirror.count("studio"), 0);
    assert_eq!(mirror.count("uniqueid"), 0);
    assert_eq!(mirror.count("art"), 0);
}

#[test]
fn test_parents_are_collected_only_when_empty() {
    let mirror = mirrored_show();
    mirror.upsert(&episode(EPISODE_1_ID, SEASON_1_ID, 1, 1));
    mirror.upsert(&episode(EPISODE_2_ID, SEASON_1_ID, 1, 2));
    mirror.upsert(&episode(EPISODE_3_ID, SEASON_2_ID, 2, 1));
    assert_eq!(mirror.count("seasons"), 2);

    mirror.remove(EPISODE_1_ID);
    assert_eq!(mirror.count("seasons"), 2);

    mirror.remove(EPISODE_2_ID);
    assert_eq!(mirror.count("seasons"), 1);
    assert!(mirror.local_id(SEASON_1_ID).is_none());
    assert_eq!(mirror.count("tvshow"), 1);

    mirror.remove(EPISODE_3_ID);
    assert_eq!(mirror.count("seasons"), 0);
    assert_eq!(mirror.count("tvshow"), 0);
    assert_eq!(mirror.mapping_count(), 0);
}

#[test]
fn test_remove_children_keeps_the_series() {
    let mirror = mirrored_show();
    mirror.upsert(&episode(EPISODE_1_ID, SEASON_1_ID, 1, 1));
    mirror.upsert(&episode(EPISODE_2_ID, SEASON_1_ID, 1, 2));
    mirror.upsert(&episode(EPISODE_3_ID, SEASON_2_ID, 2, 1));

    let removed = mirror.engine.remove_children(SHOW_ID).unwrap();

    assert_eq!(removed, 5);
    assert_eq!(mirror.count("tvshow"), 1);
    assert_eq!(mirror.count("seasons"), 0);
    assert_eq!(mirror.count("episode"), 0);
    assert_eq!(mirror.mapping_count(), 1);
    assert!(mirror.local_id(SHOW_ID).is_some());
}

#[test]
fn test_removing_series_cascades_down() {
    let mirror = mirrored_show();
    mirror.upsert(&episode(EPISODE_1_ID, SEASON_1_ID, 1, 1));
    mirror.upsert(&episode(EPISODE_3_ID, SEASON_2_ID, 2, 1));

    assert!(mirror.remove(SHOW_ID));

    assert_eq!(mirror.count("tvshow"), 0);
    assert_eq!(mirror.count("seasons"), 0);
    assert_eq!(mirror.count("episode"), 0);
    assert_eq!(mirror.mapping_count(), 0);
}

#[test]
fn test_removing_loose_episode_drops_placeholders() {
    let mirror = TestMirror::new();
    mirror.upsert(&loose_episode("510", "Lost Show", 1, 1));
    assert_eq!(mirror.mapping_count(), 3);

    mirror.remove("510");

    assert_eq!(mirror.count("tvshow"), 0);
    assert_eq!(mirror.count("seasons"), 0);
    assert_eq!(mirror.mapping_count(), 0);
}

#[test]
fn test_remove_is_idempotent() {
    let mirror = TestMirror::new();
    assert!(!mirror.remove("404"));

    mirror.upsert(&movie(MOVIE_1_ID, "Heat", UPDATED_1, &["Crime"]));
    assert!(mirror.remove(MOVIE_1_ID));
    assert!(!mirror.remove(MOVIE_1_ID));
    assert_eq!(mirror.count("movie"), 0);
    assert_eq!(mirror.count("actor"), 0);
    assert_eq!(mirror.count("genre"), 0);
    assert_eq!(mirror.count("tag"), 0);
    assert_eq!(mirror.count("rating"), 0);
}

// =============================================================================
// Music
// =============================================================================

fn mirrored_album() -> TestMirror {
    let mirror = TestMirror::new();
    mirror.upsert(&artist());
    mirror.upsert(&album(vec![
        track(TRACK_1_ID, 1, None),
        track(TRACK_2_ID, 2, None),
    ]));
    mirror
}

#[test]
fn test_removing_last_track_removes_album_and_artist() {
    let mirror = mirrored_album();

    mirror.remove(TRACK_1_ID);
    assert_eq!(mirror.count("album"), 1);
    assert_eq!(mirror.count("song"), 1);

    mirror.remove(TRACK_2_ID);
    assert_eq!(mirror.count("song"), 0);
    assert_eq!(mirror.count("album"), 0);
    assert_eq!(mirror.count("artist"), 0);
    assert_eq!(mirror.count("album_artist"), 0);
    assert_eq!(mirror.count("song_artist"), 0);
    assert_eq!(mirror.count("genre"), 0);
    assert_eq!(mirror.mapping_count(), 0);
}

#[test]
fn test_remove_children_keeps_the_artist() {
    let mirror = mirrored_album();

    let removed = mirror.engine.remove_children(ARTIST_ID).unwrap();

    assert_eq!(removed, 1);
    assert_eq!(mirror.count("artist"), 1);
    assert_eq!(mirror.count("album"), 0);
    assert_eq!(mirror.count("song"), 0);
    assert!(mirror.local_id(ALBUM_ID).is_none());
    assert!(mirror.local_id(TRACK_1_ID).is_none());
    // The artist keeps its own genre
    let artist_id = mirror.local_id(ARTIST_ID).unwrap();
    assert_eq!(
        mirror.linked(LocalKind::Artist, artist_id, AssociationKind::Genre),
        vec!["Rock"]
    );
}

#[test]
fn test_removing_album_removes_its_tracks() {
    let mirror = mirrored_album();

    assert!(mirror.remove(ALBUM_ID));

    assert_eq!(mirror.count("album"), 0);
    assert_eq!(mirror.count("song"), 0);
    assert_eq!(mirror.count("artist"), 0);
    assert_eq!(mirror.count("path"), 0);
}

#[test]
fn test_removing_single_removes_synthesized_album() {
    let mirror = TestMirror::new();
    mirror.upsert(&loose_track("950", None, "Solo Artist"));
    assert_eq!(mirror.count("album"), 1);

    mirror.remove("950");

    assert_eq!(mirror.count("album"), 0);
    assert_eq!(mirror.count("artist"), 0);
    assert_eq!(mirror.count("art"), 0);
    assert_eq!(mirror.mapping_count(), 0);
}

// =============================================================================
// Films and sets
// =============================================================================

#[test]
fn test_set_is_collected_with_its_last_movie() {
    let mirror = TestMirror::new();
    mirror.upsert(&movie_in_collection(MOVIE_1_ID, "Heat", COLLECTION_NAME));
    mirror.upsert(&movie_in_collection(MOVIE_2_ID, "Ronin", COLLECTION_NAME));

    mirror.remove(MOVIE_1_ID);
    assert_eq!(mirror.count("sets"), 1);

    mirror.remove(MOVIE_2_ID);
    assert_eq!(mirror.count("sets"), 0);
}

#[test]
fn test_removing_collection_detaches_its_movies() {
    let mirror = TestMirror::new();
    mirror.upsert(&movie_in_collection(MOVIE_1_ID, "Heat", COLLECTION_NAME));
    mirror.upsert(&collection(COLLECTION_ID, COLLECTION_NAME));

    assert!(mirror.remove(COLLECTION_ID));

    assert_eq!(mirror.count("sets"), 0);
    assert_eq!(mirror.count("movie"), 1);
    let movie_id = mirror.local_id(MOVIE_1_ID).unwrap();
    assert_eq!(mirror.engine.library().movie_set(movie_id).unwrap(), None);
    assert_eq!(
        mirror
            .engine
            .identity()
            .lookup(MOVIE_1_ID)
            .unwrap()
            .unwrap()
            .parent_local_id,
        None
    );
}

// =============================================================================
// Associations
// =============================================================================

#[test]
fn test_dropped_genre_is_collected_and_kept_genre_untouched() {
    let mirror = TestMirror::new();
    mirror.upsert(&movie(MOVIE_1_ID, "Heat", UPDATED_1, &["Action", "Comedy"]));
    let comedy_id: i64 = mirror
        .engine
        .library()
        .conn()
        .query_row("SELECT id FROM genre WHERE name = 'Comedy'", [], |r| r.get(0))
        .unwrap();

    mirror.upsert(&movie(MOVIE_1_ID, "Heat", UPDATED_2, &["Comedy"]));

    assert_eq!(mirror.count("genre"), 1);
    assert_eq!(mirror.count("genre_link"), 1);
    let still_comedy: i64 = mirror
        .engine
        .library()
        .conn()
        .query_row("SELECT id FROM genre WHERE name = 'Comedy'", [], |r| r.get(0))
        .unwrap();
    assert_eq!(still_comedy, comedy_id);
}

#[test]
fn test_genre_shared_with_another_item_survives() {
    let mirror = TestMirror::new();
    mirror.upsert(&movie(MOVIE_1_ID, "Heat", UPDATED_1, &["Action"]));
    mirror.upsert(&movie(MOVIE_2_ID, "Ronin", UPDATED_1, &["Action"]));

    mirror.remove(MOVIE_1_ID);

    assert_eq!(mirror.count("genre"), 1);
    assert_eq!(mirror.count("actor"), 3);
}
