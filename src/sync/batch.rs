//! Batch driver.
//!
//! A batch runs on one long transaction that is committed every
//! `commit_every` items. Each item gets its own savepoint, so a failing item
//! leaves no partial writes and never stops the batch. Cancellation is
//! checked between items; everything processed before it stays committed.

use super::context::UpsertContext;
use super::engine::{SyncEngine, UpsertOutcome};
use super::error::{BatchError, SyncError};
use crate::catalog::CatalogItem;
use anyhow::anyhow;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Counters of one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub processed: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Items left for the next pass because a parent could not be fetched.
    pub skipped: usize,
    pub failed: usize,
    pub removed: usize,
    pub cancelled: bool,
}

impl BatchReport {
    pub fn needs_attention(&self) -> bool {
        self.failed > 0 || self.skipped > 0
    }

    fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted | UpsertOutcome::Repaired => self.inserted += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Unchanged => self.unchanged += 1,
        }
    }

    fn record_error(&mut self, remote_id: &str, err: &SyncError) {
        if err.is_transient() {
            warn!("Skipping item {} for now: {:#}", remote_id, err);
            self.skipped += 1;
        } else {
            error!("Failed to sync item {}: {:#}", remote_id, err);
            self.failed += 1;
        }
    }
}

impl SyncEngine {
    /// Upserts `items` in order. Per-item failures are counted, not returned.
    pub fn sync_batch(
        &self,
        items: &[CatalogItem],
        ctx: &UpsertContext,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, BatchError> {
        info!("Syncing batch of {} items", items.len());
        let report = self.run_batch(items, cancel, |engine, item, report| {
            let remote_id = item.remote_id().unwrap_or("<none>");
            match engine.in_savepoint(|s| s.upsert(item, ctx)) {
                Ok(outcome) => {
                    debug!("Item {}: {:?}", remote_id, outcome);
                    report.record(outcome);
                }
                Err(e) => report.record_error(remote_id, &e),
            }
        })?;

        info!(
            "Batch done: {} processed, {} inserted, {} updated, {} unchanged, {} skipped, {} failed{}",
            report.processed,
            report.inserted,
            report.updated,
            report.unchanged,
            report.skipped,
            report.failed,
            if report.cancelled { " (cancelled)" } else { "" }
        );
        if report.needs_attention() {
            warn!(
                "{} item(s) were not synced and will be retried on the next pass",
                report.skipped + report.failed
            );
        }
        Ok(report)
    }

    /// Removes the items mirrored under `remote_ids`, in order.
    pub fn remove_batch(
        &self,
        remote_ids: &[String],
        cancel: &CancellationToken,
    ) -> Result<BatchReport, BatchError> {
        info!("Removing batch of {} items", remote_ids.len());
        let report = self.run_batch(remote_ids, cancel, |engine, remote_id, report| {
            match engine.in_savepoint(|s| s.remove(remote_id)) {
                Ok(true) => report.removed += 1,
                Ok(false) => report.unchanged += 1,
                Err(e) => report.record_error(remote_id, &e),
            }
        })?;

        info!(
            "Removal batch done: {} processed, {} removed, {} unknown, {} failed{}",
            report.processed,
            report.removed,
            report.unchanged,
            report.failed,
            if report.cancelled { " (cancelled)" } else { "" }
        );
        Ok(report)
    }

    fn run_batch<T>(
        &self,
        entries: &[T],
        cancel: &CancellationToken,
        mut step: impl FnMut(&Self, &T, &mut BatchReport),
    ) -> Result<BatchReport, BatchError> {
        self.check_storage()
            .map_err(BatchError::StorageUnavailable)?;
        self.begin()
            .map_err(|e| BatchError::StorageUnavailable(anyhow!(e)))?;

        let commit_every = self.settings().commit_every;
        let mut report = BatchReport::default();

        for entry in entries {
            if cancel.is_cancelled() {
                info!(
                    "Batch cancelled after {} of {} items",
                    report.processed,
                    entries.len()
                );
                report.cancelled = true;
                break;
            }

            step(self, entry, &mut report);
            report.processed += 1;

            if commit_every > 0 && report.processed % commit_every == 0 {
                self.checkpoint()?;
                debug!("Committed after {} items", report.processed);
            }
        }

        if let Err(e) = self.commit() {
            self.rollback();
            return Err(BatchError::StorageUnavailable(anyhow!(e)));
        }
        Ok(report)
    }

    /// Commits the work so far and opens the next transaction.
    fn checkpoint(&self) -> Result<(), BatchError> {
        if let Err(e) = self.commit().and_then(|_| self.begin()) {
            self.rollback();
            return Err(BatchError::StorageUnavailable(anyhow!(e)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::NullCatalogSource;
    use crate::config::SyncSettings;
    use crate::library::LocalKind;

    fn engine(commit_every: usize) -> SyncEngine {
        let settings = SyncSettings {
            commit_every,
            ..Default::default()
        };
        SyncEngine::in_memory(settings, Box::new(NullCatalogSource)).unwrap()
    }

    fn movie(id: &str, title: &str) -> CatalogItem {
        CatalogItem {
            rating_key: Some(id.to_string()),
            kind: Some("movie".to_string()),
            updated_at: Some("1700000000".to_string()),
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn counts_each_outcome() {
        let engine = engine(2);
        let items = vec![movie("1", "One"), movie("2", "Two"), movie("3", "Three")];
        let cancel = CancellationToken::new();

        let report = engine
            .sync_batch(&items, &UpsertContext::default(), &cancel)
            .unwrap();
        assert_eq!(report.processed, 3);
        assert_eq!(report.inserted, 3);
        assert!(!report.needs_attention());

        let again = engine
            .sync_batch(&items, &UpsertContext::default(), &cancel)
            .unwrap();
        assert_eq!(again.unchanged, 3);
        assert_eq!(again.inserted, 0);
    }

    #[test]
    fn failing_item_does_not_stop_the_batch() {
        let engine = engine(0);
        let mut broken = movie("2", "Broken");
        broken.kind = Some("photo".to_string());
        let items = vec![movie("1", "One"), broken, movie("3", "Three")];

        let report = engine
            .sync_batch(&items, &UpsertContext::default(), &CancellationToken::new())
            .unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.inserted, 2);
        assert!(report.needs_attention());
        assert_eq!(
            engine.lookup_local("3").unwrap().map(|(_, k)| k),
            Some(LocalKind::Movie)
        );
    }

    #[test]
    fn cancelled_token_processes_nothing() {
        let engine = engine(1);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = engine
            .sync_batch(&[movie("1", "One")], &UpsertContext::default(), &cancel)
            .unwrap();
        assert!(report.cancelled);
        assert_eq!(report.processed, 0);
        assert!(engine.lookup_local("1").unwrap().is_none());
    }

    #[test]
    fn remove_batch_counts_unknown_ids() {
        let engine = engine(10);
        engine
            .sync_batch(&[movie("1", "One")], &UpsertContext::default(), &CancellationToken::new())
            .unwrap();

        let ids = vec!["1".to_string(), "404".to_string()];
        let report = engine.remove_batch(&ids, &CancellationToken::new()).unwrap();
        assert_eq!(report.removed, 1);
        assert_eq!(report.unchanged, 1);
        assert!(engine.lookup_local("1").unwrap().is_none());
    }
}
