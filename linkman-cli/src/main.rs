//! Linkman command-line tool.
//!
//! Usage:
//!   linkman config set --backend-url https://bookmarks.example --api-key KEY
//!   linkman pull
//!   linkman daemon
//!
//! All state lives in one SQLite file (`--data`, default `linkman.db`).

use anyhow::Result;
use clap::Parser;
use linkman_cli::{Cli, run};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let mut stdout = std::io::stdout().lock();
    run(cli, &mut stdout).await
}
