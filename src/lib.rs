//! Catalog Mirror Library
//!
//! Mirrors a remote media catalog into a local normalized library database.
//! This library exposes the internal modules for testing and potential reuse.

pub mod catalog;
pub mod config;
pub mod identity;
pub mod library;
pub mod reconcile;
pub mod sqlite_persistence;
pub mod sync;

// Re-export commonly used types for convenience
pub use catalog::{CatalogItem, CatalogSource, NullCatalogSource, SnapshotSource};
pub use config::SyncSettings;
pub use identity::{IdentityMapping, IdentityStore};
pub use library::{LibraryStore, LocalKind};
pub use sync::{BatchReport, SyncEngine, SyncError, UpsertContext, UpsertOutcome};
