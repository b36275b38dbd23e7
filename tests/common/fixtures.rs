//! Catalog item builders.
//!
//! Items are built from JSON so they go through the same decoding as items
//! read from the media server.

#![allow(dead_code)]

use super::constants::*;
use catalog_mirror::catalog::CatalogItem;
use serde_json::{json, Value};

pub fn item(value: Value) -> CatalogItem {
    serde_json::from_value(value).expect("test item must decode")
}

fn tags(names: &[&str]) -> Vec<Value> {
    names.iter().map(|n| json!({ "tag": n })).collect()
}

pub fn movie(id: &str, title: &str, updated_at: &str, genres: &[&str]) -> CatalogItem {
    item(json!({
        "ratingKey": id,
        "type": "movie",
        "updatedAt": updated_at,
        "addedAt": 1600000000,
        "title": title,
        "year": 1995,
        "summary": format!("{} plot", title),
        "guid": "com.plexapp.agents.imdb://tt0113277?lang=en",
        "audienceRating": 8.2,
        "duration": 10200000,
        "Genre": tags(genres),
        "Role": [
            {"tag": "Al Pacino", "role": "Vincent Hanna", "thumb": "http://img/pacino.jpg"},
            {"tag": "Robert De Niro", "role": "Neil McCauley"}
        ],
        "Director": [{"tag": "Michael Mann"}],
        "Media": [{"Part": [{"file": format!("/movies/{}.mkv", id), "container": "mkv",
            "Stream": [{"streamType": 2, "codec": "aac", "channels": 2, "languageCode": "eng"}]}]}]
    }))
}

pub fn movie_in_collection(id: &str, title: &str, collection: &str) -> CatalogItem {
    let mut movie = movie(id, title, UPDATED_1, &["Crime"]);
    movie.collections = item(json!({ "Collection": tags(&[collection]) })).collections;
    movie
}

pub fn collection(id: &str, title: &str) -> CatalogItem {
    item(json!({
        "ratingKey": id,
        "type": "collection",
        "updatedAt": UPDATED_1,
        "title": title,
        "summary": "Collected heists"
    }))
}

pub fn show() -> CatalogItem {
    item(json!({
        "ratingKey": SHOW_ID,
        "type": "show",
        "updatedAt": UPDATED_1,
        "title": SHOW_TITLE,
        "guid": "com.plexapp.agents.thetvdb://81189?lang=en",
        "studio": "FOX (US)",
        "Genre": tags(&["Drama"]),
        "Location": [{"path": "/tv/The Test Show"}]
    }))
}

pub fn season(id: &str, index: i64) -> CatalogItem {
    item(json!({
        "ratingKey": id,
        "type": "season",
        "updatedAt": UPDATED_1,
        "title": format!("Season {}", index),
        "index": index,
        "parentRatingKey": SHOW_ID,
        "parentTitle": SHOW_TITLE
    }))
}

pub fn episode(id: &str, season_id: &str, season_index: i64, index: i64) -> CatalogItem {
    item(json!({
        "ratingKey": id,
        "type": "episode",
        "updatedAt": UPDATED_1,
        "title": format!("Episode {}", index),
        "index": index,
        "parentIndex": season_index,
        "parentRatingKey": season_id,
        "grandparentRatingKey": SHOW_ID,
        "grandparentTitle": SHOW_TITLE,
        "thumb": format!("http://img/ep{}.jpg", id),
        "Media": [{"Part": [{"file": format!("/tv/The Test Show/S{}E{}.mkv", season_index, index)}]}]
    }))
}

/// An episode that only names its series and season by title and number.
pub fn loose_episode(id: &str, show_title: &str, season_index: i64, index: i64) -> CatalogItem {
    item(json!({
        "ratingKey": id,
        "type": "episode",
        "updatedAt": UPDATED_1,
        "title": format!("Episode {}", index),
        "index": index,
        "parentIndex": season_index,
        "grandparentTitle": show_title
    }))
}

pub fn artist() -> CatalogItem {
    item(json!({
        "ratingKey": ARTIST_ID,
        "type": "artist",
        "updatedAt": UPDATED_1,
        "title": ARTIST_NAME,
        "summary": "A band that exists for tests",
        "thumb": "http://img/band.jpg",
        "Genre": tags(&["Rock"])
    }))
}

pub fn track(id: &str, index: i64, original_title: Option<&str>) -> CatalogItem {
    item(json!({
        "ratingKey": id,
        "type": "track",
        "updatedAt": UPDATED_1,
        "title": format!("Track {}", index),
        "index": index,
        "parentIndex": 1,
        "parentRatingKey": ALBUM_ID,
        "parentTitle": ALBUM_TITLE,
        "grandparentRatingKey": ARTIST_ID,
        "grandparentTitle": ARTIST_NAME,
        "originalTitle": original_title,
        "duration": 200000,
        "Genre": tags(&["Ignored"]),
        "Mood": tags(&["Calm", "Warm"]),
        "Media": [{"Part": [{"file": format!("/music/band/album/{:02}.flac", index)}]}]
    }))
}

pub fn album(tracks: Vec<CatalogItem>) -> CatalogItem {
    let mut album = item(json!({
        "ratingKey": ALBUM_ID,
        "type": "album",
        "updatedAt": UPDATED_1,
        "title": ALBUM_TITLE,
        "year": 2001,
        "studio": "Test Records",
        "parentRatingKey": ARTIST_ID,
        "parentTitle": ARTIST_NAME,
        "Genre": tags(&["Rock", "Indie"])
    }));
    album.children = tracks;
    album
}

/// A track without album or artist ids.
pub fn loose_track(id: &str, album_title: Option<&str>, artist_name: &str) -> CatalogItem {
    item(json!({
        "ratingKey": id,
        "type": "track",
        "updatedAt": UPDATED_1,
        "title": format!("Loose {}", id),
        "index": 1,
        "parentTitle": album_title,
        "grandparentTitle": artist_name,
        "thumb": "http://img/loose.jpg"
    }))
}
