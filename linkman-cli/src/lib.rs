//! Command-line front end for Linkman.
//!
//! Every command opens the SQLite data file (settings and the local tree
//! share it), does its work, and prints a JSON or plain-text result.
//! `daemon` keeps running the periodic mirror until interrupted.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use linkman_sync::{
    BookmarkTree, HttpTransport, LeasedMirror, MirrorOutcome, MirrorPass, Reconciler, Scheduler,
    SchedulerConfig, SearchQuery, SettingsChanged, SettingsGateway, SqliteBookmarkTree,
    SqliteLease, SqliteSettings, TransportConfig,
};
use linkman_types::{BookmarkId, ExtraHeader, NodeArena, SettingKey, Settings, SettingsPatch};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "linkman", version)]
#[command(about = "Sync a local bookmark tree with a remote bookmark service")]
pub struct Cli {
    /// SQLite file holding settings and the local tree
    #[arg(short, long, global = true, default_value = "linkman.db")]
    pub data: PathBuf,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Print the local bookmark tree
    Tree,
    /// Add a bookmark to the local tree
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        url: String,
    },
    /// Push every local bookmark to the remote service
    Import,
    /// Add remote bookmarks missing from the local tree
    Pull,
    /// Make the local tree match the remote service (requires autoSync)
    Mirror,
    /// Search the remote service
    Search(SearchArgs),
    /// Delete a remote bookmark by URL
    Delete {
        #[arg(long)]
        url: String,
    },
    /// Ask the remote service to re-process a bookmark
    Reprocess {
        #[arg(long)]
        id: BookmarkId,
    },
    /// Run the periodic mirror until Ctrl-C
    Daemon {
        /// Seconds between checks of the persisted autoSync flag
        #[arg(long, default_value = "30")]
        poll_secs: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the current settings
    Show,
    /// Change one or more settings
    Set {
        #[arg(long)]
        backend_url: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long, action = ArgAction::Set)]
        auto_sync: Option<bool>,
        /// Extra request header as KEY:VALUE; replaces the stored list
        #[arg(long = "header", value_parser = ExtraHeader::parse)]
        headers: Vec<ExtraHeader>,
        /// Remove all extra headers
        #[arg(long, conflicts_with = "headers")]
        clear_headers: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct SearchArgs {
    /// Free-text query
    #[arg(long)]
    pub q: Option<String>,
    #[arg(long)]
    pub title: Option<String>,
    /// Tag filter; repeat for several
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// RFC 3339 timestamp or YYYY-MM-DD
    #[arg(long, value_parser = parse_date)]
    pub start_date: Option<DateTime<Utc>>,
    /// RFC 3339 timestamp or YYYY-MM-DD
    #[arg(long, value_parser = parse_date)]
    pub end_date: Option<DateTime<Utc>>,
}

impl From<SearchArgs> for SearchQuery {
    fn from(args: SearchArgs) -> Self {
        Self {
            q: args.q,
            title: args.title,
            tags: args.tags,
            start_date: args.start_date,
            end_date: args.end_date,
        }
    }
}

/// Parses a full RFC 3339 timestamp, or a bare date taken as midnight UTC.
pub fn parse_date(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("expected RFC 3339 or YYYY-MM-DD, got {s:?}"))
}

/// Stores and engine opened over one data file.
pub struct App {
    pub settings: SettingsGateway,
    pub tree: Arc<SqliteBookmarkTree>,
    lease: SqliteLease,
    transport: HttpTransport,
}

impl App {
    pub fn open(data: &Path) -> Result<Self> {
        let path = data
            .to_str()
            .with_context(|| format!("data path is not valid UTF-8: {}", data.display()))?;
        let settings = SqliteSettings::open(path).context("Failed to open settings store")?;
        let tree = SqliteBookmarkTree::open(path).context("Failed to open bookmark tree")?;
        let lease = SqliteLease::open(path, format!("pid-{}", std::process::id()))
            .context("Failed to open lease store")?;
        let transport =
            HttpTransport::new(TransportConfig::default()).context("Failed to build HTTP client")?;
        Ok(Self {
            settings: SettingsGateway::new(Arc::new(settings)),
            tree: Arc::new(tree),
            lease,
            transport,
        })
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(
            self.settings.clone(),
            Arc::clone(&self.tree) as Arc<dyn BookmarkTree>,
            self.transport.clone(),
        )
    }

    /// A mirror pass that will not overlap one from another process
    /// sharing this data file.
    pub fn mirror_pass(&self) -> LeasedMirror {
        LeasedMirror::for_reconciler(self.reconciler(), self.lease.clone())
    }
}

/// Runs one command, writing its result to `out`.
pub async fn run(cli: Cli, out: &mut dyn Write) -> Result<()> {
    let app = App::open(&cli.data)?;

    match cli.command {
        Command::Config { action } => config(&app, action, out)?,
        Command::Tree => {
            let tree = app.tree.get_tree().await?;
            print_tree(&tree, out)?;
        }
        Command::Add { title, url } => {
            let node = app.tree.create(&title, &url).await?;
            writeln!(out, "{}", node.id)?;
        }
        Command::Import => {
            let report = app.reconciler().import().await.context("Import failed")?;
            print_json(&report, out)?;
        }
        Command::Pull => {
            let report = app.reconciler().pull().await.context("Pull failed")?;
            print_json(&report, out)?;
        }
        Command::Mirror => match app.mirror_pass().run_mirror().await.context("Mirror failed")? {
            MirrorOutcome::Applied(report) => print_json(&report, out)?,
            MirrorOutcome::Skipped => writeln!(out, "autoSync is off, nothing done")?,
            MirrorOutcome::Busy => writeln!(out, "another process is mirroring, nothing done")?,
        },
        Command::Search(args) => {
            let records = app
                .reconciler()
                .remote()?
                .search(&args.into())
                .await
                .context("Search failed")?;
            print_json(&records, out)?;
        }
        Command::Delete { url } => {
            app.reconciler()
                .remote()?
                .delete(&url)
                .await
                .with_context(|| format!("Failed to delete {url}"))?;
            writeln!(out, "deleted {url}")?;
        }
        Command::Reprocess { id } => {
            app.reconciler()
                .remote()?
                .reprocess(&id)
                .await
                .with_context(|| format!("Failed to reprocess {id}"))?;
            writeln!(out, "queued {id}")?;
        }
        Command::Daemon { poll_secs } => daemon(app, Duration::from_secs(poll_secs)).await?,
    }
    Ok(())
}

fn config(app: &App, action: ConfigAction, out: &mut dyn Write) -> Result<()> {
    let settings = match action {
        ConfigAction::Show => app.settings.read()?,
        ConfigAction::Set {
            backend_url,
            api_key,
            auto_sync,
            headers,
            clear_headers,
        } => {
            let mut patch = SettingsPatch::default();
            if let Some(url) = backend_url {
                patch = patch.backend_url(url);
            }
            if let Some(key) = api_key {
                patch = patch.api_key(key);
            }
            if let Some(enabled) = auto_sync {
                patch = patch.auto_sync(enabled);
            }
            if clear_headers || !headers.is_empty() {
                patch = patch.extra_headers(headers);
            }
            if patch.is_empty() {
                bail!("nothing to set; pass at least one option");
            }
            app.settings.write(patch)?
        }
    };
    print_json(&redacted(settings), out)
}

/// Hides the API key when printing.
fn redacted(mut settings: Settings) -> Settings {
    if !settings.api_key.is_empty() {
        settings.api_key = "********".to_string();
    }
    settings
}

fn print_json<T: Serialize + ?Sized>(value: &T, out: &mut dyn Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Prints folders and leaves, two spaces per level.
fn print_tree(tree: &NodeArena, out: &mut dyn Write) -> Result<()> {
    let mut stack = vec![(tree.root, 0usize)];
    while let Some((id, depth)) = stack.pop() {
        let Some(node) = tree.get(&id) else {
            continue;
        };
        let indent = "  ".repeat(depth);
        match &node.url {
            Some(url) => writeln!(out, "{indent}{} <{url}>", node.title)?,
            None => writeln!(out, "{indent}{}/", node.title)?,
        }
        stack.extend(node.children.iter().rev().map(|child| (*child, depth + 1)));
    }
    Ok(())
}

/// Runs the scheduler until Ctrl-C. Other processes change settings by
/// writing the data file, so the persisted `autoSync` flag is polled and
/// flips are fed to the scheduler as change events.
async fn daemon(app: App, poll: Duration) -> Result<()> {
    let scheduler = Arc::new(Scheduler::new(
        Arc::new(app.mirror_pass()),
        SchedulerConfig::default(),
    ));
    let mut auto_sync = scheduler.bootstrap(&app.settings)?;
    info!("Daemon started, autoSync = {}", auto_sync);
    let follower = scheduler.follow(&app.settings);

    let mut ticker = tokio::time::interval(poll.max(Duration::from_secs(1)));
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                break;
            }
            _ = ticker.tick() => match app.settings.read() {
                Ok(current) if current.auto_sync != auto_sync => {
                    auto_sync = current.auto_sync;
                    info!("autoSync changed to {}", auto_sync);
                    scheduler.on_settings_changed(&SettingsChanged {
                        settings: current,
                        changed: vec![SettingKey::AutoSync],
                    });
                }
                Ok(_) => {}
                Err(e) => warn!("Failed to re-read settings: {}", e),
            },
        }
    }

    info!("Shutting down");
    scheduler.stop();
    follower.abort();
    Ok(())
}
