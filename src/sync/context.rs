//! Request-scoped data passed along with each upsert.

/// What the caller knows about an item beyond the item itself.
#[derive(Clone, Debug)]
pub struct UpsertContext {
    /// Library section the item was listed under.
    pub view_id: Option<String>,
    /// Section name; films carry it as a tag.
    pub view_tag: Option<String>,
    /// Whether an album also upserts its tracks.
    pub scan_children: bool,
    /// Set when a track is upserted as part of its album.
    pub album: Option<AlbumContext>,
    /// Parents being synced on behalf of the current item, outermost first.
    pub(crate) lineage: Vec<String>,
}

impl Default for UpsertContext {
    fn default() -> Self {
        Self {
            view_id: None,
            view_tag: None,
            scan_children: true,
            album: None,
            lineage: Vec::new(),
        }
    }
}

impl UpsertContext {
    pub fn for_view(view_id: impl Into<String>, view_tag: impl Into<String>) -> Self {
        Self {
            view_id: Some(view_id.into()),
            view_tag: Some(view_tag.into()),
            ..Default::default()
        }
    }

    /// Context for the ancestor `parent_remote_id` synced on behalf of a
    /// child.
    pub(crate) fn for_parent(&self, parent_remote_id: &str) -> Self {
        let mut lineage = self.lineage.clone();
        lineage.push(parent_remote_id.to_string());
        Self {
            view_id: self.view_id.clone(),
            view_tag: self.view_tag.clone(),
            scan_children: false,
            album: None,
            lineage,
        }
    }

    /// Whether `remote_id` is already being synced further down the chain.
    pub(crate) fn is_resolving(&self, remote_id: &str) -> bool {
        self.lineage.iter().any(|id| id == remote_id)
    }

    pub(crate) fn for_track(&self, album: AlbumContext) -> Self {
        Self {
            view_id: self.view_id.clone(),
            view_tag: self.view_tag.clone(),
            scan_children: false,
            album: Some(album),
            lineage: self.lineage.clone(),
        }
    }
}

/// Album attributes that its tracks inherit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AlbumContext {
    pub genres: Vec<String>,
    pub compilation: bool,
}
