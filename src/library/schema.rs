//! SQLite schema of the mirrored library.
//!
//! Entity tables use dense integer ids allocated as `max(id) + 1`. Association
//! master tables are unique on a case-insensitive name; link tables carry a
//! `media_type` discriminator next to `media_id`.

use crate::sqlite_column;
use crate::sqlite_persistence::{ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema};

// =============================================================================
// Paths, files and per-file details
// =============================================================================

const PATH_TABLE: Table = Table {
    name: "path",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("path", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("parent_path_id", &SqlType::Integer),
        sqlite_column!("content", &SqlType::Text), // 'movies', 'tvshows' or NULL
        sqlite_column!("date_added", &SqlType::Text),
    ],
    indices: &[],
    unique_constraints: &[],
};

const PATH_FK: ForeignKey = ForeignKey {
    foreign_table: "path",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Restrict,
};

const FILES_TABLE: Table = Table {
    name: "files",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "path_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&PATH_FK)
        ),
        sqlite_column!("filename", &SqlType::Text, non_null = true),
        sqlite_column!("date_added", &SqlType::Text),
        sqlite_column!("play_count", &SqlType::Integer),
        sqlite_column!("last_played", &SqlType::Text),
    ],
    indices: &[("idx_files_path", "path_id")],
    unique_constraints: &[&["path_id", "filename"]],
};

const FILE_FK: ForeignKey = ForeignKey {
    foreign_table: "files",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const BOOKMARK_TABLE: Table = Table {
    name: "bookmark",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "file_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&FILE_FK)
        ),
        sqlite_column!("time_seconds", &SqlType::Integer, non_null = true),
        sqlite_column!("total_seconds", &SqlType::Integer, non_null = true),
        sqlite_column!("player", &SqlType::Text),
    ],
    indices: &[("idx_bookmark_file", "file_id")],
    unique_constraints: &[],
};

const STREAM_DETAILS_TABLE: Table = Table {
    name: "stream_details",
    columns: &[
        sqlite_column!(
            "file_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&FILE_FK)
        ),
        sqlite_column!("stream_type", &SqlType::Integer, non_null = true), // 0 video, 1 audio, 2 subtitle
        sqlite_column!("video_codec", &SqlType::Text),
        sqlite_column!("video_aspect", &SqlType::Real),
        sqlite_column!("video_width", &SqlType::Integer),
        sqlite_column!("video_height", &SqlType::Integer),
        sqlite_column!("video_duration", &SqlType::Integer),
        sqlite_column!("audio_codec", &SqlType::Text),
        sqlite_column!("audio_channels", &SqlType::Integer),
        sqlite_column!("audio_language", &SqlType::Text),
        sqlite_column!("subtitle_language", &SqlType::Text),
    ],
    indices: &[("idx_stream_details_file", "file_id")],
    unique_constraints: &[],
};

// =============================================================================
// Video entities
// =============================================================================

const SETS_TABLE: Table = Table {
    name: "sets",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "name",
            &SqlType::Text,
            non_null = true,
            collate_nocase = true,
            is_unique = true
        ),
        sqlite_column!("overview", &SqlType::Text),
    ],
    indices: &[],
    unique_constraints: &[],
};

const MOVIE_TABLE: Table = Table {
    name: "movie",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("file_id", &SqlType::Integer),
        sqlite_column!("path_id", &SqlType::Integer),
        sqlite_column!("set_id", &SqlType::Integer),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("sort_title", &SqlType::Text),
        sqlite_column!("plot", &SqlType::Text),
        sqlite_column!("tagline", &SqlType::Text),
        sqlite_column!("year", &SqlType::Integer),
        sqlite_column!("premiered", &SqlType::Text),
        sqlite_column!("runtime", &SqlType::Integer),
        sqlite_column!("content_rating", &SqlType::Text),
        sqlite_column!("genre", &SqlType::Text), // " / " joined, denormalized
        sqlite_column!("writer", &SqlType::Text),
        sqlite_column!("director", &SqlType::Text),
        sqlite_column!("studio", &SqlType::Text),
        sqlite_column!("country", &SqlType::Text),
        sqlite_column!("play_url", &SqlType::Text),
        sqlite_column!("user_rating", &SqlType::Integer),
    ],
    indices: &[("idx_movie_set", "set_id"), ("idx_movie_file", "file_id")],
    unique_constraints: &[],
};

const TVSHOW_TABLE: Table = Table {
    name: "tvshow",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("path_id", &SqlType::Integer),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("sort_title", &SqlType::Text),
        sqlite_column!("plot", &SqlType::Text),
        sqlite_column!("premiered", &SqlType::Text),
        sqlite_column!("content_rating", &SqlType::Text),
        sqlite_column!("genre", &SqlType::Text),
        sqlite_column!("studio", &SqlType::Text),
    ],
    indices: &[],
    unique_constraints: &[],
};

const TVSHOW_LINK_PATH_TABLE: Table = Table {
    name: "tvshowlinkpath",
    columns: &[
        sqlite_column!("show_id", &SqlType::Integer, non_null = true),
        sqlite_column!("path_id", &SqlType::Integer, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[&["show_id", "path_id"]],
};

const SEASONS_TABLE: Table = Table {
    name: "seasons",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("show_id", &SqlType::Integer, non_null = true),
        sqlite_column!("season", &SqlType::Integer, non_null = true),
        sqlite_column!("name", &SqlType::Text),
    ],
    indices: &[],
    unique_constraints: &[&["show_id", "season"]],
};

const EPISODE_TABLE: Table = Table {
    name: "episode",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("file_id", &SqlType::Integer),
        sqlite_column!("path_id", &SqlType::Integer),
        sqlite_column!("show_id", &SqlType::Integer, non_null = true),
        sqlite_column!("season_id", &SqlType::Integer, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("plot", &SqlType::Text),
        sqlite_column!("writer", &SqlType::Text),
        sqlite_column!("director", &SqlType::Text),
        sqlite_column!("premiered", &SqlType::Text),
        sqlite_column!("runtime", &SqlType::Integer),
        sqlite_column!("season_number", &SqlType::Integer, non_null = true),
        sqlite_column!("episode_number", &SqlType::Integer, non_null = true),
        sqlite_column!("play_url", &SqlType::Text),
        sqlite_column!("user_rating", &SqlType::Integer),
    ],
    indices: &[
        ("idx_episode_season", "season_id"),
        ("idx_episode_show", "show_id"),
    ],
    unique_constraints: &[],
};

// =============================================================================
// Music entities
// =============================================================================

const ARTIST_TABLE: Table = Table {
    name: "artist",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true, collate_nocase = true),
        sqlite_column!("genres", &SqlType::Text),
        sqlite_column!("biography", &SqlType::Text),
        sqlite_column!("image", &SqlType::Text),
        sqlite_column!("fanart", &SqlType::Text),
        sqlite_column!("last_scraped", &SqlType::Text),
    ],
    indices: &[("idx_artist_name", "name")],
    unique_constraints: &[],
};

const ALBUM_TABLE: Table = Table {
    name: "album",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text),
        sqlite_column!("artists", &SqlType::Text),
        sqlite_column!("year", &SqlType::Integer),
        sqlite_column!("genres", &SqlType::Text),
        sqlite_column!("review", &SqlType::Text),
        sqlite_column!("image", &SqlType::Text),
        sqlite_column!("user_rating", &SqlType::Integer),
        sqlite_column!("last_scraped", &SqlType::Text),
        sqlite_column!("release_type", &SqlType::Text, non_null = true), // 'album' or 'single'
        sqlite_column!("label", &SqlType::Text),
        sqlite_column!(
            "compilation",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

const ALBUM_ARTIST_TABLE: Table = Table {
    name: "album_artist",
    columns: &[
        sqlite_column!("artist_id", &SqlType::Integer, non_null = true),
        sqlite_column!("album_id", &SqlType::Integer, non_null = true),
        sqlite_column!("artist_name", &SqlType::Text),
    ],
    indices: &[("idx_album_artist_album", "album_id")],
    unique_constraints: &[&["artist_id", "album_id"]],
};

const SONG_TABLE: Table = Table {
    name: "song",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("album_id", &SqlType::Integer, non_null = true),
        sqlite_column!("path_id", &SqlType::Integer),
        sqlite_column!("artists", &SqlType::Text),
        sqlite_column!("genres", &SqlType::Text),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("track", &SqlType::Integer),
        sqlite_column!("duration", &SqlType::Integer),
        sqlite_column!("year", &SqlType::Integer),
        sqlite_column!("filename", &SqlType::Text),
        sqlite_column!(
            "times_played",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("last_played", &SqlType::Text),
        sqlite_column!("user_rating", &SqlType::Integer),
        sqlite_column!("mood", &SqlType::Text),
    ],
    indices: &[("idx_song_album", "album_id")],
    unique_constraints: &[],
};

const SONG_ARTIST_TABLE: Table = Table {
    name: "song_artist",
    columns: &[
        sqlite_column!("artist_id", &SqlType::Integer, non_null = true),
        sqlite_column!("song_id", &SqlType::Integer, non_null = true),
        sqlite_column!("role", &SqlType::Text),
        sqlite_column!("sort_order", &SqlType::Integer, non_null = true),
        sqlite_column!("artist_name", &SqlType::Text),
    ],
    indices: &[("idx_song_artist_artist", "artist_id")],
    unique_constraints: &[&["artist_id", "song_id"]],
};

// =============================================================================
// Associations: master + link tables
// =============================================================================

macro_rules! master_table {
    ($name:literal) => {
        Table {
            name: $name,
            columns: &[
                sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
                sqlite_column!(
                    "name",
                    &SqlType::Text,
                    non_null = true,
                    collate_nocase = true,
                    is_unique = true
                ),
            ],
            indices: &[],
            unique_constraints: &[],
        }
    };
}

macro_rules! link_table {
    ($name:literal, $master_fk:ident, $media_index:literal) => {
        Table {
            name: $name,
            columns: &[
                sqlite_column!(
                    "master_id",
                    &SqlType::Integer,
                    non_null = true,
                    foreign_key = Some(&$master_fk)
                ),
                sqlite_column!("media_id", &SqlType::Integer, non_null = true),
                sqlite_column!("media_type", &SqlType::Text, non_null = true),
            ],
            indices: &[($media_index, "media_id, media_type")],
            unique_constraints: &[&["master_id", "media_id", "media_type"]],
        }
    };
}

const GENRE_FK: ForeignKey = ForeignKey {
    foreign_table: "genre",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};
const TAG_FK: ForeignKey = ForeignKey {
    foreign_table: "tag",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};
const STUDIO_FK: ForeignKey = ForeignKey {
    foreign_table: "studio",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};
const COUNTRY_FK: ForeignKey = ForeignKey {
    foreign_table: "country",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};
const ACTOR_FK: ForeignKey = ForeignKey {
    foreign_table: "actor",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const GENRE_TABLE: Table = master_table!("genre");
const GENRE_LINK_TABLE: Table = link_table!("genre_link", GENRE_FK, "idx_genre_link_media");
const TAG_TABLE: Table = master_table!("tag");
const TAG_LINK_TABLE: Table = link_table!("tag_link", TAG_FK, "idx_tag_link_media");
const STUDIO_TABLE: Table = master_table!("studio");
const STUDIO_LINK_TABLE: Table = link_table!("studio_link", STUDIO_FK, "idx_studio_link_media");
const COUNTRY_TABLE: Table = master_table!("country");
const COUNTRY_LINK_TABLE: Table =
    link_table!("country_link", COUNTRY_FK, "idx_country_link_media");

// People share one master table across the three roles
const ACTOR_TABLE: Table = master_table!("actor");

const ACTOR_LINK_TABLE: Table = Table {
    name: "actor_link",
    columns: &[
        sqlite_column!(
            "master_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ACTOR_FK)
        ),
        sqlite_column!("media_id", &SqlType::Integer, non_null = true),
        sqlite_column!("media_type", &SqlType::Text, non_null = true),
        sqlite_column!("role", &SqlType::Text),
        sqlite_column!("cast_order", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_actor_link_media", "media_id, media_type")],
    unique_constraints: &[&["master_id", "media_id", "media_type"]],
};
const DIRECTOR_LINK_TABLE: Table =
    link_table!("director_link", ACTOR_FK, "idx_director_link_media");
const WRITER_LINK_TABLE: Table = link_table!("writer_link", ACTOR_FK, "idx_writer_link_media");

// =============================================================================
// Per-item auxiliary records
// =============================================================================

const ART_TABLE: Table = Table {
    name: "art",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("media_id", &SqlType::Integer, non_null = true),
        sqlite_column!("media_type", &SqlType::Text, non_null = true),
        sqlite_column!("type", &SqlType::Text, non_null = true), // thumb, fanart, banner
        sqlite_column!("url", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[&["media_id", "media_type", "type"]],
};

const UNIQUEID_TABLE: Table = Table {
    name: "uniqueid",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("media_id", &SqlType::Integer, non_null = true),
        sqlite_column!("media_type", &SqlType::Text, non_null = true),
        sqlite_column!("value", &SqlType::Text, non_null = true),
        sqlite_column!("type", &SqlType::Text, non_null = true), // imdb, tvdb, unknown
    ],
    indices: &[],
    unique_constraints: &[&["media_id", "media_type", "type"]],
};

const RATING_TABLE: Table = Table {
    name: "rating",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("media_id", &SqlType::Integer, non_null = true),
        sqlite_column!("media_type", &SqlType::Text, non_null = true),
        sqlite_column!("rating_type", &SqlType::Text, non_null = true),
        sqlite_column!("rating", &SqlType::Real),
        sqlite_column!("votes", &SqlType::Integer),
    ],
    indices: &[],
    unique_constraints: &[&["media_id", "media_type", "rating_type"]],
};

pub const LIBRARY_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        PATH_TABLE,
        FILES_TABLE,
        BOOKMARK_TABLE,
        STREAM_DETAILS_TABLE,
        SETS_TABLE,
        MOVIE_TABLE,
        TVSHOW_TABLE,
        TVSHOW_LINK_PATH_TABLE,
        SEASONS_TABLE,
        EPISODE_TABLE,
        ARTIST_TABLE,
        ALBUM_TABLE,
        ALBUM_ARTIST_TABLE,
        SONG_TABLE,
        SONG_ARTIST_TABLE,
        GENRE_TABLE,
        GENRE_LINK_TABLE,
        TAG_TABLE,
        TAG_LINK_TABLE,
        STUDIO_TABLE,
        STUDIO_LINK_TABLE,
        COUNTRY_TABLE,
        COUNTRY_LINK_TABLE,
        ACTOR_TABLE,
        ACTOR_LINK_TABLE,
        DIRECTOR_LINK_TABLE,
        WRITER_LINK_TABLE,
        ART_TABLE,
        UNIQUEID_TABLE,
        RATING_TABLE,
    ],
    migration: None,
}];
