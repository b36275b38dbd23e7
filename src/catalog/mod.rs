mod api;
mod item;
mod source;

pub use api::{
    join_list, normalize_studio, unix_to_local_date, Provider, DEFAULT_DATE_ADDED, MISSING_INDEX,
    MISSING_TITLE, UNKNOWN_LANGUAGE,
};
pub use item::{CatalogItem, ItemKind, Location, Media, Part, Role, Stream, Tag};
pub use source::{CatalogSource, FetchError, NullCatalogSource, SnapshotSource};
