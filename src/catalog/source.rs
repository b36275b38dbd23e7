//! The remote catalog as seen by the engine: fetch one item, or the children
//! of one item. Transport and authentication live behind this trait.

use super::item::CatalogItem;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("item {0} not found on the server")]
    NotFound(String),
    #[error("not authorized to fetch item {0}")]
    Unauthorized(String),
    #[error("transport error: {0}")]
    Transport(String),
}

pub trait CatalogSource: Send + Sync {
    fn fetch_item(&self, remote_id: &str) -> Result<CatalogItem, FetchError>;

    fn fetch_children(&self, remote_id: &str) -> Result<Vec<CatalogItem>, FetchError>;
}

/// A source that knows nothing; every parent must already be mirrored or
/// gets synthesized.
pub struct NullCatalogSource;

impl CatalogSource for NullCatalogSource {
    fn fetch_item(&self, remote_id: &str) -> Result<CatalogItem, FetchError> {
        Err(FetchError::NotFound(remote_id.to_string()))
    }

    fn fetch_children(&self, _remote_id: &str) -> Result<Vec<CatalogItem>, FetchError> {
        Ok(Vec::new())
    }
}

/// In-memory snapshot of part of the catalog, e.g. loaded from an export.
#[derive(Default)]
pub struct SnapshotSource {
    items: HashMap<String, CatalogItem>,
}

impl SnapshotSource {
    pub fn new(items: impl IntoIterator<Item = CatalogItem>) -> Self {
        let mut source = Self::default();
        for item in items {
            source.insert(item);
        }
        source
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog snapshot {:?}", path))?;
        let items = CatalogItem::list_from_json(&json)
            .with_context(|| format!("Failed to parse catalog snapshot {:?}", path))?;
        Ok(Self::new(items))
    }

    /// Items without a remote id are ignored.
    pub fn insert(&mut self, item: CatalogItem) {
        if let Some(id) = item.remote_id() {
            self.items.insert(id.to_string(), item);
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl CatalogSource for SnapshotSource {
    fn fetch_item(&self, remote_id: &str) -> Result<CatalogItem, FetchError> {
        self.items
            .get(remote_id)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(remote_id.to_string()))
    }

    fn fetch_children(&self, remote_id: &str) -> Result<Vec<CatalogItem>, FetchError> {
        if let Some(parent) = self.items.get(remote_id) {
            if !parent.children.is_empty() {
                return Ok(parent.children.clone());
            }
        }
        let mut children: Vec<CatalogItem> = self
            .items
            .values()
            .filter(|item| item.parent_id() == Some(remote_id))
            .cloned()
            .collect();
        children.sort_by_key(|item| item.remote_id().map(str::to_string));
        Ok(children)
    }
}
