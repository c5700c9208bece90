//! NWS weather-alert paging poller CLI.
//!
//! Designed to run from cron or a systemd timer: `poller run` executes one
//! poll cycle and exits 0 even when the cycle degraded (feed down, synthesis
//! failed, pages failed); retry is by recurrence of the schedule, not by
//! backoff. The remaining subcommands are read-only debugging aids.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;

use poller::config::{PollerConfig, DEFAULT_SOUNDS_DIR, DEFAULT_STATE_FILE, DEFAULT_SUBS_FILE};
use poller::cycle::{run_cycle, CycleDeps};
use poller::feed::FeedClient;
use poller::ledger::Ledger;
use poller::lock::CycleLock;
use poller::{sweep, thread};

/// NWS weather-alert paging poller
#[derive(Parser)]
#[command(name = "poller")]
#[command(about = "Polls NWS alerts and pages subscribed extensions, once per alert thread")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Subscription store (read-only)
    #[arg(long, env = "NWS_SUBS_FILE", default_value = DEFAULT_SUBS_FILE, global = true)]
    subs_file: PathBuf,

    /// Dedup ledger file
    #[arg(long, env = "NWS_STATE_FILE", default_value = DEFAULT_STATE_FILE, global = true)]
    state_file: PathBuf,

    /// Directory for cached announcement audio
    #[arg(long, env = "NWS_SOUNDS_DIR", default_value = DEFAULT_SOUNDS_DIR, global = true)]
    sounds_dir: PathBuf,

    /// Artifact retention in seconds
    #[arg(long, env = "NWS_CACHE_TTL_SECS", default_value_t = 172_800, global = true)]
    cache_ttl_secs: u64,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one poll cycle (the cron entrypoint)
    Run,
    /// Fetch and print the current active alert set
    Fetch,
    /// Print the seen-pairs dedup ledger
    Ledger,
    /// Run only the artifact retention sweep
    Sweep,
}

impl Cli {
    fn config(&self) -> PollerConfig {
        PollerConfig {
            subs_file: self.subs_file.clone(),
            state_file: self.state_file.clone(),
            sounds_dir: self.sounds_dir.clone(),
            cache_ttl: std::time::Duration::from_secs(self.cache_ttl_secs),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("poller=debug,paging=debug")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("poller=info,paging=info")),
            )
            .init();
    }

    let config = cli.config();

    match cli.command {
        Commands::Run => {
            let Some(_lock) = CycleLock::acquire(&config.lock_file()) else {
                warn!("Another poll cycle is running, skipping this one");
                return Ok(());
            };

            let deps = CycleDeps::from_config(&config);
            run_cycle(&config, &deps).await;
        }
        Commands::Fetch => {
            let records = FeedClient::with_defaults()
                .fetch_active()
                .await
                .context("fetching active alerts")?;

            let summaries: Vec<_> = records
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "thread_id": thread::resolve(r).as_str(),
                        "id": r.id,
                        "event": r.event,
                        "areaDesc": r.area_desc,
                        "headline": r.headline,
                        "sent": r.sent,
                        "same": r.same_codes,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        Commands::Ledger => {
            let ledger = Ledger::load(&config.state_file).await;
            for pair in ledger.sorted_pairs() {
                println!("{pair}");
            }
        }
        Commands::Sweep => {
            let report = sweep::sweep(&config.sounds_dir, config.cache_ttl).await;
            println!("removed {} artifact(s), {} failure(s)", report.removed, report.failed);
        }
    }

    Ok(())
}
