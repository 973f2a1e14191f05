//! Reconciler: runs the three sync policies against the local tree and
//! the remote service.
//!
//! Every run starts from a fresh settings snapshot and a fresh read of
//! both sides, computes a [`ReconciliationPlan`](crate::plan::ReconciliationPlan),
//! then applies it. Order within a run: remote read, plan, local mutation,
//! remote mutation.
//!
//! | policy  | reads            | writes                        |
//! |---------|------------------|-------------------------------|
//! | import  | local tree       | remote upserts                |
//! | pull    | remote, local    | local creates                 |
//! | mirror  | remote, local    | local creates, local deletes  |
//!
//! Per-item failures are counted, not propagated. The one fatal case is a
//! failed remote read during mirror: the run aborts before touching the
//! local tree.

use crate::error::SyncResult;
use crate::flatten::flatten;
use crate::plan::{IMPORT_TAGS, plan_mirror, plan_pull, plan_push};
use crate::remote::RemoteBookmarks;
use crate::settings::SettingsGateway;
use crate::transport::HttpTransport;
use crate::tree::BookmarkTree;
use linkman_types::{BookmarkRecord, FlatBookmark, NewBookmark};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of an import (push).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub success: usize,
    pub fail: usize,
}

/// Result of a pull-merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PullReport {
    pub created: usize,
    pub failed: usize,
}

/// Result of an applied mirror pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MirrorReport {
    pub created: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// What a mirror invocation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorOutcome {
    /// Auto-sync was off when the pass started; nothing was read or written.
    Skipped,
    /// Another process held the mirror lease; nothing was read or written.
    Busy,
    Applied(MirrorReport),
}

/// Runs sync policies between a local tree and the remote service.
pub struct Reconciler {
    settings: SettingsGateway,
    tree: Arc<dyn BookmarkTree>,
    transport: HttpTransport,
}

impl Reconciler {
    pub fn new(
        settings: SettingsGateway,
        tree: Arc<dyn BookmarkTree>,
        transport: HttpTransport,
    ) -> Self {
        Self {
            settings,
            tree,
            transport,
        }
    }

    /// Builds a remote client from the current settings. Fails before any
    /// network call when the backend URL is unset.
    pub fn remote(&self) -> SyncResult<RemoteBookmarks> {
        let settings = self.settings.read()?;
        RemoteBookmarks::from_settings(self.transport.clone(), &settings)
    }

    async fn local_leaves(&self) -> SyncResult<Vec<FlatBookmark>> {
        let tree = self.tree.get_tree().await?;
        Ok(flatten(&tree))
    }

    // ── Policies ─────────────────────────────────────────────────

    /// Push: upserts every local leaf remotely, tagged `imported`.
    /// Each upsert is independent; failures are tallied.
    pub async fn import(&self) -> SyncResult<ImportReport> {
        let remote = self.remote()?;
        let local = self.local_leaves().await?;
        let plan = plan_push(&local);

        let mut report = ImportReport::default();
        for leaf in &plan.to_create_remotely {
            let title = (!leaf.title.is_empty()).then(|| leaf.title.clone());
            let body = NewBookmark::new(leaf.url.clone(), title, IMPORT_TAGS);
            match remote.create(&body).await {
                Ok(()) => report.success += 1,
                Err(e) => {
                    warn!("Failed to import {}: {}", leaf.url, e);
                    report.fail += 1;
                }
            }
        }

        info!(
            "Import finished: {} succeeded, {} failed",
            report.success, report.fail
        );
        Ok(report)
    }

    /// Pull-merge: creates a local leaf for every remote bookmark whose URL
    /// is not in the tree. Never updates or deletes local leaves.
    pub async fn pull(&self) -> SyncResult<PullReport> {
        let remote = self.remote()?;
        let records = remote.fetch_all().await?;
        let local = self.local_leaves().await?;
        let plan = plan_pull(&local, &records);

        let (created, failed) = self.create_locally(&plan.to_create_locally).await;
        let report = PullReport { created, failed };
        info!(
            "Pull finished: {} created, {} failed ({} remote, {} local)",
            report.created,
            report.failed,
            records.len(),
            local.len()
        );
        Ok(report)
    }

    /// Mirror: makes the local URL set equal to the remote one.
    ///
    /// Re-checks `autoSync` at invocation and skips when it is off. If the
    /// remote read fails the error is returned and the local tree is left
    /// untouched.
    pub async fn mirror(&self) -> SyncResult<MirrorOutcome> {
        let settings = self.settings.read()?;
        if !settings.auto_sync {
            info!("Auto-sync is disabled, skipping mirror");
            return Ok(MirrorOutcome::Skipped);
        }
        let remote = RemoteBookmarks::from_settings(self.transport.clone(), &settings)?;

        let records = match remote.fetch_all().await {
            Ok(records) => records,
            Err(e) => {
                warn!("Mirror aborted, remote read failed: {}", e);
                return Err(e);
            }
        };
        let local = self.local_leaves().await?;
        let plan = plan_mirror(&local, &records);

        let (created, create_failed) = self.create_locally(&plan.to_create_locally).await;
        let (deleted, delete_failed) = self.delete_locally(&plan.to_delete_locally).await;

        let report = MirrorReport {
            created,
            deleted,
            failed: create_failed + delete_failed,
        };
        info!(
            "Mirror finished: {} created, {} deleted, {} failed",
            report.created, report.deleted, report.failed
        );
        Ok(MirrorOutcome::Applied(report))
    }

    // ── Apply helpers ────────────────────────────────────────────

    async fn create_locally(&self, records: &[BookmarkRecord]) -> (usize, usize) {
        let (mut created, mut failed) = (0, 0);
        for record in records {
            match self.tree.create(record.display_title(), &record.url).await {
                Ok(_) => created += 1,
                Err(e) => {
                    warn!("Failed to create local bookmark {}: {}", record.url, e);
                    failed += 1;
                }
            }
        }
        (created, failed)
    }

    async fn delete_locally(&self, leaves: &[FlatBookmark]) -> (usize, usize) {
        let (mut deleted, mut failed) = (0, 0);
        for leaf in leaves {
            match self.tree.remove(&leaf.id).await {
                Ok(()) => deleted += 1,
                Err(e) => {
                    warn!("Failed to remove local bookmark {}: {}", leaf.url, e);
                    failed += 1;
                }
            }
        }
        (deleted, failed)
    }
}
