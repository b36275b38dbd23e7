//! Value types shared by the library store, the reconcilers and the engine.

use serde::Serialize;
use std::fmt;

// =============================================================================
// Enumerations
// =============================================================================

/// Kind of a local library record. Doubles as the `media_type` discriminator
/// in link tables, since local ids are only unique within a kind.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
pub enum LocalKind {
    Movie,
    TvShow,
    Season,
    Episode,
    Artist,
    Album,
    Song,
    Set,
}

impl LocalKind {
    pub const ALL: [LocalKind; 8] = [
        LocalKind::Movie,
        LocalKind::TvShow,
        LocalKind::Season,
        LocalKind::Episode,
        LocalKind::Artist,
        LocalKind::Album,
        LocalKind::Song,
        LocalKind::Set,
    ];

    /// Convert from database string representation
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "movie" => Some(LocalKind::Movie),
            "tvshow" => Some(LocalKind::TvShow),
            "season" => Some(LocalKind::Season),
            "episode" => Some(LocalKind::Episode),
            "artist" => Some(LocalKind::Artist),
            "album" => Some(LocalKind::Album),
            "song" => Some(LocalKind::Song),
            "set" => Some(LocalKind::Set),
            _ => None,
        }
    }

    /// Convert to database string representation
    pub fn to_db_str(&self) -> &'static str {
        match self {
            LocalKind::Movie => "movie",
            LocalKind::TvShow => "tvshow",
            LocalKind::Season => "season",
            LocalKind::Episode => "episode",
            LocalKind::Artist => "artist",
            LocalKind::Album => "album",
            LocalKind::Song => "song",
            LocalKind::Set => "set",
        }
    }
}

impl fmt::Display for LocalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

/// `media_type` of portrait artwork rows owned by people.
pub const ACTOR_MEDIA_TYPE: &str = "actor";

// =============================================================================
// Stream details
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VideoStream {
    pub codec: Option<String>,
    pub aspect: Option<f64>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub duration: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AudioStream {
    pub codec: Option<String>,
    pub channels: Option<i64>,
    pub language: String,
}

/// Technical stream descriptors of one file, replaced wholesale on every sync.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StreamDetails {
    pub video: Vec<VideoStream>,
    pub audio: Vec<AudioStream>,
    pub subtitles: Vec<String>,
}

impl StreamDetails {
    pub fn is_empty(&self) -> bool {
        self.video.is_empty() && self.audio.is_empty() && self.subtitles.is_empty()
    }
}

// =============================================================================
// Play state
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Playstate {
    pub resume_seconds: i64,
    pub total_seconds: i64,
    pub play_count: Option<i64>,
    pub last_played: Option<String>,
}

/// Row counts reported by `catalog-mirror stats`.
#[derive(Clone, Debug, Default, Serialize)]
pub struct LibraryStats {
    pub movies: i64,
    pub sets: i64,
    pub tvshows: i64,
    pub seasons: i64,
    pub episodes: i64,
    pub artists: i64,
    pub albums: i64,
    pub songs: i64,
    pub files: i64,
    pub paths: i64,
    pub genres: i64,
    pub tags: i64,
    pub studios: i64,
    pub countries: i64,
    pub people: i64,
}
