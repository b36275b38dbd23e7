mod artwork;
pub mod entities;
mod models;
mod schema;
mod store;

pub use artwork::{delete_art, replace_art, ArtworkCache, NoopArtworkCache, RecordingArtworkCache};
pub use entities::{
    insert_row, update_row, AlbumRow, ArtistRow, EntityRow, EntitySchema, EpisodeRow, MovieRow,
    SeasonRow, SetRow, SongRow, TvShowRow, RELEASE_TYPE_ALBUM, RELEASE_TYPE_SINGLE,
};
pub use models::{
    AudioStream, LibraryStats, LocalKind, Playstate, StreamDetails, VideoStream,
    ACTOR_MEDIA_TYPE,
};
pub use schema::LIBRARY_VERSIONED_SCHEMAS;
pub use store::LibraryStore;
