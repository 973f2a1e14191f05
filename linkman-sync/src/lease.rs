//! Cross-process mirror lease.
//!
//! The scheduler's in-flight guard only covers one process. When several
//! processes share a data file (a daemon plus manual `mirror` runs), they
//! coordinate through a row in a `leases` table instead. A lease expires
//! after its TTL so a crashed holder cannot block mirroring for good.

use crate::error::{SyncError, SyncResult};
use crate::reconciler::{MirrorOutcome, Reconciler};
use crate::scheduler::MirrorPass;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, params};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Lease name used for mirror passes.
pub const MIRROR_LEASE: &str = "mirror";

/// How long a mirror lease lasts without being released.
pub const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(10 * 60);

/// Named, expiring leases stored in SQLite.
#[derive(Debug, Clone)]
pub struct SqliteLease {
    conn: Arc<Mutex<Connection>>,
    holder: String,
}

impl SqliteLease {
    /// Opens (or creates) the lease table at the given path. `holder`
    /// identifies this process in the table.
    pub fn open(path: &str, holder: impl Into<String>) -> SyncResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| SyncError::Storage(format!("failed to open lease store: {e}")))?;
        Self::with_connection(conn, holder.into())
    }

    fn with_connection(conn: Connection, holder: String) -> SyncResult<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS leases (
                name TEXT PRIMARY KEY,
                holder TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );",
        )
        .map_err(|e| SyncError::Storage(format!("failed to init lease schema: {e}")))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            holder,
        })
    }

    fn lock(&self) -> SyncResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| SyncError::Storage("lease store lock poisoned".to_string()))
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    /// Takes `name` for `ttl` if it is free, expired, or already ours.
    pub fn try_acquire(&self, name: &str, ttl: Duration) -> SyncResult<bool> {
        let now = Utc::now().timestamp_millis();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let conn = self.lock()?;
        let changed = conn.execute(
            "INSERT INTO leases (name, holder, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE
                SET holder = excluded.holder, expires_at = excluded.expires_at
                WHERE leases.expires_at <= ?4 OR leases.holder = excluded.holder",
            params![name, self.holder, now.saturating_add(ttl_ms), now],
        )?;
        Ok(changed == 1)
    }

    /// Gives up `name` if we hold it.
    pub fn release(&self, name: &str) -> SyncResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM leases WHERE name = ?1 AND holder = ?2",
            params![name, self.holder],
        )?;
        Ok(())
    }
}

/// A mirror pass that first takes the shared [`MIRROR_LEASE`].
pub struct LeasedMirror {
    pass: Arc<dyn MirrorPass>,
    lease: SqliteLease,
    ttl: Duration,
}

impl LeasedMirror {
    pub fn new(pass: Arc<dyn MirrorPass>, lease: SqliteLease) -> Self {
        Self {
            pass,
            lease,
            ttl: DEFAULT_LEASE_TTL,
        }
    }

    pub fn for_reconciler(reconciler: Reconciler, lease: SqliteLease) -> Self {
        Self::new(Arc::new(reconciler), lease)
    }
}

#[async_trait]
impl MirrorPass for LeasedMirror {
    async fn run_mirror(&self) -> SyncResult<MirrorOutcome> {
        if !self.lease.try_acquire(MIRROR_LEASE, self.ttl)? {
            info!("Another process is mirroring, skipping this pass");
            return Ok(MirrorOutcome::Busy);
        }
        debug!("Mirror lease taken by {}", self.lease.holder());

        let outcome = self.pass.run_mirror().await;
        if let Err(e) = self.lease.release(MIRROR_LEASE) {
            warn!("Failed to release mirror lease: {}", e);
        }
        outcome
    }
}
