//! Bookmark sync engine for Linkman.
//!
//! Keeps a local hierarchical bookmark tree and a remote bookmark service
//! consistent under three policies:
//! - **Import** (push): upsert every local bookmark remotely.
//! - **Pull** (merge): add remote bookmarks missing locally, never delete.
//! - **Mirror**: make the local URL set match the remote one, deleting local
//!   bookmarks the remote does not have. The remote always wins.
//!
//! # Components
//!
//! - **Transport**: HTTP with bounded exponential-backoff retry
//! - **Remote**: typed client for the bookmark service
//! - **Tree**: local tree stores and the flattener
//! - **Reconciler**: plans and applies each policy
//! - **Scheduler**: periodic mirror with overlap prevention
//! - **Lease**: keeps mirror passes from overlapping across processes
//! - **Settings**: configuration snapshots and change notifications
//!
//! # Example
//!
//! ```no_run
//! use linkman_sync::{
//!     HttpTransport, MemoryBookmarkTree, Reconciler, Scheduler, SchedulerConfig,
//!     SettingsGateway, TransportConfig,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> linkman_sync::SyncResult<()> {
//! let settings = SettingsGateway::in_memory();
//! let tree = Arc::new(MemoryBookmarkTree::new());
//! let transport = HttpTransport::new(TransportConfig::default())?;
//!
//! let reconciler = Arc::new(Reconciler::new(settings.clone(), tree, transport));
//! let scheduler = Arc::new(Scheduler::new(reconciler, SchedulerConfig::default()));
//! scheduler.bootstrap(&settings)?;
//! scheduler.follow(&settings);
//! # Ok(())
//! # }
//! ```

mod error;
pub mod flatten;
pub mod lease;
pub mod plan;
pub mod reconciler;
pub mod remote;
pub mod scheduler;
pub mod settings;
pub mod transport;
pub mod tree;

pub use error::{SyncError, SyncResult};
pub use flatten::flatten;
pub use lease::{DEFAULT_LEASE_TTL, LeasedMirror, MIRROR_LEASE, SqliteLease};
pub use plan::{IMPORT_TAGS, ReconciliationPlan, plan_mirror, plan_pull, plan_push};
pub use reconciler::{ImportReport, MirrorOutcome, MirrorReport, PullReport, Reconciler};
pub use remote::{RemoteBookmarks, SearchQuery};
pub use scheduler::{DEFAULT_PERIOD, MirrorPass, Scheduler, SchedulerConfig};
pub use settings::{
    MemorySettings, SettingsBackend, SettingsChanged, SettingsGateway, SqliteSettings,
};
pub use transport::{HttpRequest, HttpTransport, RetryPolicy, TransportConfig};
pub use tree::{BookmarkTree, MemoryBookmarkTree, SqliteBookmarkTree};
