//! `plume` — exerciser for the Plume replicated ledger primitive.
//!
//! Builds an in-process replica ensemble (file-backed by default, so
//! ledgers survive between invocations) and drives it through the client
//! core.
//!
//! # Usage
//!
//! ```text
//! plume write-single-ledger 10      # one ledger, ten entries
//! plume write-many-ledgers 5        # five ledgers, one entry each
//! plume read 0                      # stream ledger 0 back
//! plume -c plume.toml read 0        # with a config file
//! plume --memory write-single-ledger 3
//! ```
//!
//! Exit code 0 on success; non-zero with the error printed otherwise.

mod config;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use plume_client::{LedgerHandle, PlumeClient};
use plume_meta::{FjallMetaStore, MemoryMetaStore, MetadataStore};
use plume_net::LocalTransport;
use plume_replica::{FileReplica, MemoryReplica, ReplicaStore};
use plume_types::{EntryId, LedgerId, ReplicaId};
use tracing::{info, warn};

use config::CliConfig;

// -----------------------------------------------------------------------
// CLI definition
// -----------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "plume", version, about = "Plume replicated ledger exerciser")]
struct Cli {
    /// Path to TOML config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override data directory.
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Run fully in-memory (no disk persistence).
    #[arg(short, long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create one ledger and append a batch of sequential entries.
    WriteSingleLedger {
        /// Number of entries to append.
        count: u64,
    },

    /// Create a batch of ledgers with one entry each.
    WriteManyLedgers {
        /// Number of ledgers to create.
        count: u64,
    },

    /// Stream all confirmed entries of a ledger to stdout.
    Read {
        /// Id of the ledger to read.
        ledger_id: u64,
    },
}

// -----------------------------------------------------------------------
// Entrypoint
// -----------------------------------------------------------------------

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = CliConfig::load(cli.config.as_deref()).context("failed to load config")?;

    // CLI args override config file values.
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = dir;
    }
    if cli.memory {
        config.storage.backend = "memory".to_string();
    }

    setup_tracing(&config.log.level);

    let client = build_client(&config).context("failed to assemble client")?;

    match cli.command {
        Commands::WriteSingleLedger { count } => cmd_write_single_ledger(&client, &config, count).await,
        Commands::WriteManyLedgers { count } => cmd_write_many_ledgers(&client, &config, count).await,
        Commands::Read { ledger_id } => cmd_read(&client, &config, LedgerId(ledger_id)).await,
    }
}

/// Initialize the `tracing` subscriber with the given level filter.
///
/// Respects `RUST_LOG` env var if set, otherwise uses the config value.
fn setup_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

// -----------------------------------------------------------------------
// Client assembly
// -----------------------------------------------------------------------

/// Wire up the metadata store, replica pool and transport into a client.
fn build_client(config: &CliConfig) -> Result<PlumeClient> {
    let memory_mode = config.storage.backend == "memory";

    let meta: Arc<dyn MetadataStore> = if memory_mode {
        info!("using in-memory metadata store");
        Arc::new(MemoryMetaStore::new())
    } else {
        let meta_path = config.storage.data_dir.join("meta");
        Arc::new(FjallMetaStore::open(&meta_path).context("failed to open metadata store")?)
    };

    let mut endpoints: HashMap<ReplicaId, Arc<dyn ReplicaStore>> = HashMap::new();
    for i in 0..config.storage.replicas {
        let id = ReplicaId(i);
        let store: Arc<dyn ReplicaStore> = if memory_mode {
            Arc::new(MemoryReplica::new())
        } else {
            let path = config.storage.data_dir.join("replicas").join(id.to_string());
            Arc::new(FileReplica::new(&path).context("failed to initialize replica store")?)
        };
        endpoints.insert(id, store);
    }

    let transport = Arc::new(LocalTransport::new(endpoints));
    let replicas = transport.replica_ids();

    info!(
        backend = %config.storage.backend,
        replicas = replicas.len(),
        data_dir = %config.storage.data_dir.display(),
        "replica pool ready"
    );

    Ok(PlumeClient::new(
        meta,
        transport,
        replicas,
        config.client_config(),
    ))
}

// -----------------------------------------------------------------------
// Commands
// -----------------------------------------------------------------------

/// Append `count` sequential entries to one new ledger.
async fn cmd_write_single_ledger(client: &PlumeClient, config: &CliConfig, count: u64) -> Result<()> {
    let handle = client
        .create_ledger(
            config.quorum_config(),
            config.digest_type()?,
            config.digest.password.as_bytes(),
        )
        .await?;
    println!(
        "{}",
        format!("created ledger {}", handle.id()).green()
    );

    let result = append_batch(&handle, count).await;
    close_ledger(&handle).await;
    result
}

async fn append_batch(handle: &LedgerHandle, count: u64) -> Result<()> {
    for i in 0..count {
        let payload = format!("entry {i} appended by the plume exerciser");
        let entry_id = handle.append(payload.into_bytes()).await?;
        println!(
            "{}",
            format!("written entry {entry_id} to ledger {}", handle.id()).green()
        );
    }
    Ok(())
}

/// Create `count` ledgers with a single entry each.
async fn cmd_write_many_ledgers(client: &PlumeClient, config: &CliConfig, count: u64) -> Result<()> {
    for i in 0..count {
        let handle = client
            .create_ledger(
                config.quorum_config(),
                config.digest_type()?,
                config.digest.password.as_bytes(),
            )
            .await?;

        let payload = format!("ledger {i} greeting from the plume exerciser");
        let result = handle.append(payload.into_bytes()).await;
        close_ledger(&handle).await;

        let entry_id = result?;
        println!(
            "{}",
            format!(
                "written entry to ledger {} with entry id {entry_id}",
                handle.id()
            )
            .green()
        );
    }
    Ok(())
}

/// Stream all confirmed entries of a ledger to stdout.
async fn cmd_read(client: &PlumeClient, config: &CliConfig, ledger_id: LedgerId) -> Result<()> {
    println!(
        "{}",
        format!("reading ledger {ledger_id}").green()
    );

    let handle = client
        .open_ledger(
            ledger_id,
            config.digest_type()?,
            config.digest.password.as_bytes(),
        )
        .await?;

    let Some(last_confirmed) = handle.last_confirmed() else {
        println!("{}", format!("ledger {ledger_id} has no confirmed entries").green());
        return Ok(());
    };

    let mut cursor = handle.read_range(EntryId(0), last_confirmed)?;
    while let Some(entry) = cursor.next_entry().await? {
        let text = String::from_utf8_lossy(&entry.payload);
        println!(
            "{}",
            format!("read entry {}: {text}", entry.entry_id).green()
        );
    }
    Ok(())
}

/// Close a ledger on every exit path, logging (not surfacing) a failure:
/// close errors must not mask the error that got us here.
async fn close_ledger(handle: &LedgerHandle) {
    if let Err(err) = handle.close().await {
        warn!(ledger_id = %handle.id(), %err, "failed to close ledger");
    }
}
