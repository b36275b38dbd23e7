mod batch;
mod context;
mod engine;
mod error;
mod hierarchy;
mod music;
mod paths;
mod removal;
mod shows;
mod video;

pub use batch::BatchReport;
pub use context::{AlbumContext, UpsertContext};
pub use engine::{SyncEngine, UpsertOutcome};
pub use error::{BatchError, SyncError};

use crate::catalog::CatalogItem;
use crate::library::LocalKind;
use engine::{SyncSession, Target};

/// Upsert and removal of one kind of local record.
pub(crate) trait KindSync {
    /// Writes the record described by `item` to `target`, including its
    /// associations and mapping.
    fn upsert(
        &self,
        s: &SyncSession<'_>,
        item: &CatalogItem,
        ctx: &UpsertContext,
        target: Target,
    ) -> Result<UpsertOutcome, SyncError>;

    /// Deletes the record and its descendants, then collects ancestors it
    /// leaves empty.
    fn remove(&self, s: &SyncSession<'_>, local_id: i64) -> Result<(), SyncError>;

    /// Deletes the descendants only. Returns how many records were removed.
    fn remove_children(&self, _s: &SyncSession<'_>, _local_id: i64) -> Result<usize, SyncError> {
        Ok(0)
    }
}

pub(crate) fn kind_sync(kind: LocalKind) -> &'static dyn KindSync {
    match kind {
        LocalKind::Movie => &video::MovieSync,
        LocalKind::Set => &video::CollectionSync,
        LocalKind::TvShow => &shows::ShowSync,
        LocalKind::Season => &shows::SeasonSync,
        LocalKind::Episode => &shows::EpisodeSync,
        LocalKind::Artist => &music::ArtistSync,
        LocalKind::Album => &music::AlbumSync,
        LocalKind::Song => &music::TrackSync,
    }
}
