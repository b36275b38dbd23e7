//! The sync engine facade.
//!
//! One engine owns one connection to each store and is the only writer to
//! them. Every public operation runs in its own transaction spanning both
//! databases; the batch driver instead keeps a transaction open across many
//! items and isolates each item with a savepoint.

use super::context::UpsertContext;
use super::error::SyncError;
use super::{kind_sync, removal};
use crate::catalog::{CatalogItem, CatalogSource};
use crate::config::{ChecksumPolicy, SyncSettings};
use crate::identity::{IdentityMapping, IdentityStore};
use crate::library::{
    ArtworkCache, LibraryStats, LibraryStore, LocalKind, NoopArtworkCache, Playstate,
};
use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    /// The mapping pointed at a local record that no longer existed.
    Repaired,
    Unchanged,
}

pub struct SyncEngine {
    identity: IdentityStore,
    library: LibraryStore,
    settings: SyncSettings,
    source: Box<dyn CatalogSource>,
    artwork: Box<dyn ArtworkCache>,
}

impl SyncEngine {
    pub fn open(
        library_db: &Path,
        identity_db: &Path,
        settings: SyncSettings,
        source: Box<dyn CatalogSource>,
    ) -> Result<Self> {
        let library = LibraryStore::open(library_db)?;
        let identity = IdentityStore::open(identity_db)?;
        info!(
            "Opened library {:?} and identity store {:?}",
            library_db, identity_db
        );
        Ok(Self::new(identity, library, settings, source))
    }

    pub fn in_memory(settings: SyncSettings, source: Box<dyn CatalogSource>) -> Result<Self> {
        Ok(Self::new(
            IdentityStore::open_in_memory()?,
            LibraryStore::open_in_memory()?,
            settings,
            source,
        ))
    }

    pub fn new(
        identity: IdentityStore,
        library: LibraryStore,
        settings: SyncSettings,
        source: Box<dyn CatalogSource>,
    ) -> Self {
        Self {
            identity,
            library,
            settings,
            source,
            artwork: Box::new(NoopArtworkCache),
        }
    }

    pub fn with_artwork_cache(mut self, artwork: Box<dyn ArtworkCache>) -> Self {
        self.artwork = artwork;
        self
    }

    pub fn library(&self) -> &LibraryStore {
        &self.library
    }

    pub fn identity(&self) -> &IdentityStore {
        &self.identity
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub(crate) fn session(&self) -> SyncSession<'_> {
        SyncSession {
            identity: &self.identity,
            library: &self.library,
            settings: &self.settings,
            source: self.source.as_ref(),
            artwork: self.artwork.as_ref(),
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Inserts or updates one item, resolving its parents as needed.
    pub fn upsert(
        &self,
        item: &CatalogItem,
        ctx: &UpsertContext,
    ) -> Result<UpsertOutcome, SyncError> {
        self.in_transaction(|s| s.upsert(item, ctx))
    }

    /// Removes the item mirrored under `remote_id`. Unknown ids are a no-op
    /// and return false.
    pub fn remove(&self, remote_id: &str) -> Result<bool, SyncError> {
        self.in_transaction(|s| s.remove(remote_id))
    }

    /// Removes the descendants of a series, season, artist, album or
    /// collection, keeping the item itself. Returns how many were removed.
    pub fn remove_children(&self, remote_id: &str) -> Result<usize, SyncError> {
        self.in_transaction(|s| s.remove_children(remote_id))
    }

    pub fn lookup_local(&self, remote_id: &str) -> Result<Option<(i64, LocalKind)>> {
        Ok(self
            .identity
            .lookup(remote_id)?
            .map(|m| (m.local_id, m.local_kind)))
    }

    /// Updates the play state of a movie, episode or track. `mark_played`
    /// counts one more view and clears the resume point. Returns false when
    /// the item is not mirrored.
    pub fn update_playstate(
        &self,
        remote_id: &str,
        mark_played: bool,
        view_count: Option<i64>,
        resume_seconds: i64,
        duration_seconds: i64,
        last_played: Option<&str>,
    ) -> Result<bool, SyncError> {
        self.in_transaction(|s| {
            let Some(mapping) = s.identity.lookup(remote_id)? else {
                debug!("No mapping for {}, ignoring play state", remote_id);
                return Ok(false);
            };
            let (view_count, resume_seconds) = if mark_played {
                (view_count.unwrap_or(0) + 1, 0)
            } else {
                (view_count.unwrap_or(0), resume_seconds)
            };
            match mapping.local_kind {
                LocalKind::Song => {
                    s.library
                        .set_song_playstate(mapping.local_id, view_count, last_played)?;
                }
                LocalKind::Movie | LocalKind::Episode => {
                    let Some(file_id) = mapping.file_id else {
                        warn!("Item {} has no file, ignoring play state", remote_id);
                        return Ok(false);
                    };
                    let state = Playstate {
                        resume_seconds,
                        total_seconds: duration_seconds,
                        play_count: Some(view_count),
                        last_played: last_played.map(str::to_string),
                    };
                    s.library.set_playstate(file_id, &state)?;
                }
                other => {
                    debug!("{} {} has no play state", other, remote_id);
                    return Ok(false);
                }
            }
            debug!(
                "Play state of {}: {} views, resume at {}s",
                remote_id, view_count, resume_seconds
            );
            Ok(true)
        })
    }

    pub fn stats(&self) -> Result<LibraryStats> {
        self.library.stats()
    }

    /// Fails when either store cannot be queried.
    pub fn check_storage(&self) -> Result<()> {
        self.identity.ping()?;
        self.library.ping()?;
        Ok(())
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    fn connections(&self) -> [&Connection; 2] {
        // The identity store commits first: a mapping whose record is missing
        // is repaired on the next upsert, a record without mapping is not.
        [self.identity.conn(), self.library.conn()]
    }

    pub(crate) fn begin(&self) -> rusqlite::Result<()> {
        let [identity, library] = self.connections();
        identity.execute("BEGIN IMMEDIATE", [])?;
        if let Err(e) = library.execute("BEGIN IMMEDIATE", []) {
            let _ = identity.execute("ROLLBACK", []);
            return Err(e);
        }
        Ok(())
    }

    pub(crate) fn commit(&self) -> rusqlite::Result<()> {
        for conn in self.connections() {
            conn.execute("COMMIT", [])?;
        }
        Ok(())
    }

    pub(crate) fn rollback(&self) {
        for conn in self.connections() {
            let _ = conn.execute("ROLLBACK", []);
        }
    }

    fn in_transaction<T>(
        &self,
        f: impl FnOnce(&SyncSession<'_>) -> Result<T, SyncError>,
    ) -> Result<T, SyncError> {
        self.begin()?;
        let result = f(&self.session());
        match result {
            Ok(value) => {
                if let Err(e) = self.commit() {
                    self.rollback();
                    return Err(e.into());
                }
                Ok(value)
            }
            Err(e) => {
                self.rollback();
                Err(e)
            }
        }
    }

    /// Runs `f` inside an open transaction, undoing only its own writes when
    /// it fails.
    pub(crate) fn in_savepoint<T>(
        &self,
        f: impl FnOnce(&SyncSession<'_>) -> Result<T, SyncError>,
    ) -> Result<T, SyncError> {
        self.session().savepoint("sync_item", f)
    }
}

// =============================================================================
// Session
// =============================================================================

/// Borrowed view of the engine used by the per-kind code. Runs on whatever
/// transaction is currently open.
pub(crate) struct SyncSession<'a> {
    pub identity: &'a IdentityStore,
    pub library: &'a LibraryStore,
    pub settings: &'a SyncSettings,
    pub source: &'a dyn CatalogSource,
    pub artwork: &'a dyn ArtworkCache,
}

/// Where an upsert writes to.
#[derive(Clone, Debug)]
pub(crate) struct Target {
    pub local_id: i64,
    pub previous: Option<IdentityMapping>,
    pub outcome: UpsertOutcome,
}

impl Target {
    /// Whether the record row has to be inserted rather than updated.
    pub fn needs_insert(&self) -> bool {
        self.outcome != UpsertOutcome::Updated
    }

    pub fn previous_file(&self) -> Option<i64> {
        self.previous.as_ref().and_then(|m| m.file_id)
    }
}

impl SyncSession<'_> {
    pub fn conn(&self) -> &Connection {
        self.library.conn()
    }

    pub fn upsert(
        &self,
        item: &CatalogItem,
        ctx: &UpsertContext,
    ) -> Result<UpsertOutcome, SyncError> {
        let remote_id = item.remote_id().ok_or(SyncError::MissingIdentity)?;
        let kind = item
            .item_kind()
            .ok_or_else(|| SyncError::UnsupportedKind(item.kind.clone().unwrap_or_default()))?;
        let local_kind = kind.local_kind();
        let checksum = item.checksum();

        let mut previous = self.identity.lookup(remote_id)?;
        if let Some(mapping) = &previous {
            if mapping.local_kind != local_kind {
                warn!(
                    "Item {} changed kind from {} to {}, re-creating it",
                    remote_id, mapping.local_kind, local_kind
                );
                self.remove(remote_id)?;
                previous = None;
            }
        }

        let target = match previous {
            None => Target {
                local_id: self.allocate_id(local_kind)?,
                previous: None,
                outcome: UpsertOutcome::Inserted,
            },
            Some(mapping) => {
                if !self.library.exists(local_kind, mapping.local_id)? {
                    // The id is only reused when no other item still claims it
                    let shared = self
                        .identity
                        .by_local(mapping.local_id, local_kind)?
                        .iter()
                        .any(|m| m.remote_id != remote_id);
                    let local_id = if shared {
                        self.allocate_id(local_kind)?
                    } else {
                        mapping.local_id
                    };
                    warn!(
                        "Local {} {} of item {} is missing, re-creating it as {}",
                        local_kind, mapping.local_id, remote_id, local_id
                    );
                    Target {
                        local_id,
                        previous: Some(mapping),
                        outcome: UpsertOutcome::Repaired,
                    }
                } else if self.settings.checksum_policy == ChecksumPolicy::IdAndUpdatedAt
                    && mapping.checksum == checksum
                {
                    debug!("Item {} is unchanged", remote_id);
                    return Ok(UpsertOutcome::Unchanged);
                } else {
                    Target {
                        local_id: mapping.local_id,
                        previous: Some(mapping),
                        outcome: UpsertOutcome::Updated,
                    }
                }
            }
        };

        kind_sync(local_kind).upsert(self, item, ctx, target)
    }

    /// Next local id of `kind`. Ids still held by a mapping are never handed
    /// out again, even when their record was deleted behind our back.
    pub fn allocate_id(&self, kind: LocalKind) -> Result<i64, SyncError> {
        let next = self.library.next_id(kind)?;
        let mapped = self.identity.max_local_id(kind)?;
        Ok(next.max(mapped + 1))
    }

    /// Get-or-create the movie set named `name`.
    pub fn set_for(&self, name: &str) -> Result<i64, SyncError> {
        if let Some(id) = self.library.find_set(name)? {
            return Ok(id);
        }
        let id = self.allocate_id(LocalKind::Set)?;
        self.library.create_set(id, name)?;
        Ok(id)
    }

    /// Runs `f` under a named savepoint on both connections.
    pub fn savepoint<T>(
        &self,
        name: &str,
        f: impl FnOnce(&SyncSession<'_>) -> Result<T, SyncError>,
    ) -> Result<T, SyncError> {
        let conns = [self.identity.conn(), self.library.conn()];
        for conn in conns {
            conn.execute_batch(&format!("SAVEPOINT {name}"))?;
        }
        let result = f(self);
        match &result {
            Ok(_) => {
                for conn in conns {
                    conn.execute_batch(&format!("RELEASE {name}"))?;
                }
            }
            Err(_) => {
                for conn in conns {
                    let _ = conn.execute_batch(&format!("ROLLBACK TO {name}; RELEASE {name}"));
                }
            }
        }
        result
    }

    pub fn remove(&self, remote_id: &str) -> Result<bool, SyncError> {
        removal::remove(self, remote_id)
    }

    pub fn remove_children(&self, remote_id: &str) -> Result<usize, SyncError> {
        removal::remove_children(self, remote_id)
    }

    /// Writes the mapping of a just upserted item.
    pub fn record_mapping(
        &self,
        item: &CatalogItem,
        ctx: &UpsertContext,
        kind: LocalKind,
        target: &Target,
        file_id: Option<i64>,
        path_id: Option<i64>,
        parent_local_id: Option<i64>,
    ) -> Result<(), SyncError> {
        let remote_id = item.remote_id().ok_or(SyncError::MissingIdentity)?;
        let view_id = ctx.view_id.clone().or_else(|| {
            target
                .previous
                .as_ref()
                .and_then(|m| m.view_id.clone())
        });
        let mapping = IdentityMapping {
            remote_id: remote_id.to_string(),
            local_kind: kind,
            local_id: target.local_id,
            file_id,
            path_id,
            parent_local_id,
            checksum: item.checksum(),
            view_id,
        };
        self.identity.upsert_mapping(&mapping)?;
        Ok(())
    }

    /// Drops the placeholder mappings of a record that a real item took over.
    pub fn adopt(&self, kind: LocalKind, local_id: i64) -> Result<(), SyncError> {
        for mapping in self.identity.by_local(local_id, kind)? {
            if mapping.is_synthetic() {
                debug!(
                    "{} {} adopted, dropping placeholder mapping {}",
                    kind, local_id, mapping.remote_id
                );
                self.identity.delete_mapping(&mapping.remote_id)?;
            }
        }
        Ok(())
    }

    /// Removes the old file row when an item's file changed.
    pub fn replace_file(&self, target: &Target, file_id: i64) -> Result<(), SyncError> {
        if let Some(old) = target.previous_file() {
            if old != file_id {
                debug!("Removing old file entry {}", old);
                self.library.remove_file(old)?;
            }
        }
        Ok(())
    }
}
