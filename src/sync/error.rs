use crate::catalog::FetchError;
use crate::library::LocalKind;
use thiserror::Error;

/// Failure of a single upsert or removal. Never aborts a batch.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("item has no usable remote id")]
    MissingIdentity,

    #[error("parent {remote_id} is not available: {source}")]
    ParentUnavailable {
        remote_id: String,
        #[source]
        source: FetchError,
    },

    #[error("parent {0} is its own ancestor")]
    ParentCycle(String),

    #[error("parent {remote_id} is a {found}, expected a {expected}")]
    ParentKindMismatch {
        remote_id: String,
        expected: LocalKind,
        found: String,
    },

    #[error("unsupported item kind '{0}'")]
    UnsupportedKind(String),

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl SyncError {
    /// Transient errors are skipped for this pass; the next sync repairs them.
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::ParentUnavailable { .. })
    }
}

/// Conditions that stop a batch before anything is written.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("storage unavailable: {0:#}")]
    StorageUnavailable(anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_parent_fetch_failures_are_transient() {
        let err = SyncError::ParentUnavailable {
            remote_id: "7".to_string(),
            source: FetchError::Unauthorized("7".to_string()),
        };
        assert!(err.is_transient());
        assert!(err.to_string().contains("parent 7"));
        assert!(!SyncError::MissingIdentity.is_transient());
        assert!(!SyncError::UnsupportedKind("photo".to_string()).is_transient());
        assert!(!SyncError::ParentCycle("7".to_string()).is_transient());
    }
}
