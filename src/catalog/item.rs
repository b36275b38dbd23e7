//! Remote catalog item descriptors, as served by the media server's JSON API.
//!
//! Attribute values are frequently sent as strings even when numeric, and
//! sometimes as numbers when usually strings. Scalars are therefore kept as
//! raw `Option<String>` and interpreted by the accessors in `api.rs`.

use crate::library::LocalKind;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected a scalar attribute, got {}",
            other
        ))),
    }
}

/// Kind of a remote catalog item.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ItemKind {
    Movie,
    Show,
    Season,
    Episode,
    Artist,
    Album,
    Track,
    Collection,
}

impl ItemKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "movie" => Some(ItemKind::Movie),
            "show" => Some(ItemKind::Show),
            "season" => Some(ItemKind::Season),
            "episode" => Some(ItemKind::Episode),
            "artist" => Some(ItemKind::Artist),
            "album" => Some(ItemKind::Album),
            "track" => Some(ItemKind::Track),
            "collection" => Some(ItemKind::Collection),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Movie => "movie",
            ItemKind::Show => "show",
            ItemKind::Season => "season",
            ItemKind::Episode => "episode",
            ItemKind::Artist => "artist",
            ItemKind::Album => "album",
            ItemKind::Track => "track",
            ItemKind::Collection => "collection",
        }
    }

    pub fn local_kind(&self) -> LocalKind {
        match self {
            ItemKind::Movie => LocalKind::Movie,
            ItemKind::Show => LocalKind::TvShow,
            ItemKind::Season => LocalKind::Season,
            ItemKind::Episode => LocalKind::Episode,
            ItemKind::Artist => LocalKind::Artist,
            ItemKind::Album => LocalKind::Album,
            ItemKind::Track => LocalKind::Song,
            ItemKind::Collection => LocalKind::Set,
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `<Genre tag="..."/>` and friends.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Tag {
    #[serde(default, deserialize_with = "lenient_string")]
    pub tag: Option<String>,
}

/// A cast credit: `tag` is the person, `role` the character.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Role {
    #[serde(default, deserialize_with = "lenient_string")]
    pub tag: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub thumb: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Location {
    #[serde(default, deserialize_with = "lenient_string")]
    pub path: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    #[serde(default, deserialize_with = "lenient_string")]
    pub stream_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub codec: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub height: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub width: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub aspect_ratio: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub channels: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub language_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub profile: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Part {
    #[serde(default, deserialize_with = "lenient_string")]
    pub file: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub key: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub container: Option<String>,
    #[serde(default, rename = "Stream")]
    pub streams: Vec<Stream>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    #[serde(default, deserialize_with = "lenient_string")]
    pub aspect_ratio: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub container: Option<String>,
    #[serde(default, rename = "Part")]
    pub parts: Vec<Part>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub rating_key: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "lenient_string")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub key: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub updated_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub added_at: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title_sort: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub original_title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub tagline: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub year: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub content_rating: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub originally_available_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub studio: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub guid: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub duration: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub view_offset: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub view_count: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub last_viewed_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub audience_rating: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub rating: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub user_rating: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub index: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub parent_rating_key: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub parent_title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub parent_index: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub grandparent_rating_key: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub grandparent_title: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub thumb: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub art: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub banner: Option<String>,

    #[serde(default, rename = "Genre")]
    pub genres: Vec<Tag>,
    #[serde(default, rename = "Country")]
    pub countries: Vec<Tag>,
    #[serde(default, rename = "Collection")]
    pub collections: Vec<Tag>,
    #[serde(default, rename = "Mood")]
    pub moods: Vec<Tag>,
    #[serde(default, rename = "Role")]
    pub roles: Vec<Role>,
    #[serde(default, rename = "Writer")]
    pub writers: Vec<Tag>,
    #[serde(default, rename = "Director")]
    pub directors: Vec<Tag>,
    #[serde(default, rename = "Location")]
    pub locations: Vec<Location>,
    #[serde(default, rename = "Media")]
    pub media: Vec<Media>,

    /// Child items when the server sent them inline (albums with tracks).
    #[serde(default, rename = "Children")]
    pub children: Vec<CatalogItem>,
}

impl CatalogItem {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Accepts either a bare array of items or a `{"Metadata": [...]}`
    /// container, as returned by the server's listing endpoints.
    pub fn list_from_json(json: &str) -> serde_json::Result<Vec<Self>> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Listing {
            Bare(Vec<CatalogItem>),
            Container {
                #[serde(rename = "Metadata", default)]
                metadata: Vec<CatalogItem>,
            },
        }
        Ok(match serde_json::from_str(json)? {
            Listing::Bare(items) => items,
            Listing::Container { metadata } => metadata,
        })
    }
}
