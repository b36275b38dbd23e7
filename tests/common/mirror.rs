//! A mirror engine on throwaway databases.

#![allow(dead_code)]

use catalog_mirror::catalog::{CatalogItem, CatalogSource, NullCatalogSource};
use catalog_mirror::config::SyncSettings;
use catalog_mirror::library::LocalKind;
use catalog_mirror::reconcile::{linked_names, AssociationKind};
use catalog_mirror::sync::{SyncEngine, UpsertContext, UpsertOutcome};
use tempfile::TempDir;

pub struct TestMirror {
    pub engine: SyncEngine,
    // Held so the databases outlive the engine
    _dir: TempDir,
}

impl TestMirror {
    pub fn new() -> Self {
        Self::build(SyncSettings::default(), Box::new(NullCatalogSource))
    }

    pub fn with_source(source: impl CatalogSource + 'static) -> Self {
        Self::build(SyncSettings::default(), Box::new(source))
    }

    pub fn with_settings(settings: SyncSettings) -> Self {
        Self::build(settings, Box::new(NullCatalogSource))
    }

    fn build(settings: SyncSettings, source: Box<dyn CatalogSource>) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let engine = SyncEngine::open(
            &dir.path().join("library.db"),
            &dir.path().join("mirror_identity.db"),
            settings,
            source,
        )
        .expect("engine opens");
        Self { engine, _dir: dir }
    }

    pub fn upsert(&self, item: &CatalogItem) -> UpsertOutcome {
        self.engine
            .upsert(item, &UpsertContext::for_view("1", "Movies"))
            .expect("upsert succeeds")
    }

    pub fn remove(&self, remote_id: &str) -> bool {
        self.engine.remove(remote_id).expect("remove succeeds")
    }

    pub fn local_id(&self, remote_id: &str) -> Option<i64> {
        self.engine
            .lookup_local(remote_id)
            .expect("lookup succeeds")
            .map(|(id, _)| id)
    }

    pub fn local(&self, remote_id: &str) -> Option<(i64, LocalKind)> {
        self.engine.lookup_local(remote_id).expect("lookup succeeds")
    }

    /// Row count of a library table.
    pub fn count(&self, table: &str) -> i64 {
        self.engine
            .library()
            .conn()
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
            .expect("count query")
    }

    pub fn mapping_count(&self) -> i64 {
        self.engine.identity().count().expect("mapping count")
    }

    pub fn linked(&self, kind: LocalKind, id: i64, assoc: AssociationKind) -> Vec<String> {
        linked_names(self.engine.library().conn(), id, kind, assoc).expect("linked names")
    }

    /// Counts of every association master and link table, for idempotence
    /// checks.
    pub fn association_counts(&self) -> Vec<i64> {
        [
            "genre",
            "genre_link",
            "tag",
            "tag_link",
            "studio",
            "studio_link",
            "country",
            "country_link",
            "actor",
            "actor_link",
        ]
        .iter()
        .map(|t| self.count(t))
        .collect()
    }
}
