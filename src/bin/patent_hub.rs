//! CLI binary for patent-hub.

use clap::{Args, Parser, Subcommand};
use patent_coord::{DatabaseId, PatentDatabase, deadline_token, export};
use patent_hub::{HubConfig, SearchInput, hub_dirs, logging};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// patent-hub: one patent search across many patent offices.
#[derive(Parser)]
#[command(name = "patent-hub", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Search several databases and merge the results.
    Search(SearchArgs),

    /// List configured backends and known patent offices.
    Databases,

    /// Write a default configuration file.
    InitConfig {
        /// Destination; defaults to the standard config location.
        path: Option<PathBuf>,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
struct SearchArgs {
    /// Database ids to search (repeat or comma-separate).
    #[arg(long = "db", required = true, value_delimiter = ',')]
    databases: Vec<String>,

    /// Search keyword (repeatable).
    #[arg(short, long = "keyword")]
    keywords: Vec<String>,

    /// Look up a specific patent number.
    #[arg(long)]
    patent_number: Option<String>,

    /// Query databases one at a time instead of concurrently.
    #[arg(long)]
    sequential: bool,

    /// Maximum results per database.
    #[arg(long)]
    max_results: Option<usize>,

    /// Abort the whole search after this many seconds.
    #[arg(long)]
    deadline: Option<u64>,

    /// Export the merged results to this file.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Export format: json or csv.
    #[arg(long)]
    format: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config
    let (config, base_dir) = load_config(cli.config.as_deref())?;
    let _log_guard = logging::init(&config.logging, &hub_dirs::logs_dir())?;

    match cli.command {
        Command::Search(args) => run_search(config, &base_dir, args).await,
        Command::Databases => list_databases(&config),
        Command::InitConfig { path, force } => init_config(path, force),
    }
}

/// The config to use and the directory relative fixture paths resolve against.
fn load_config(explicit: Option<&Path>) -> anyhow::Result<(HubConfig, PathBuf)> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = HubConfig::default_config_path();
            if !default.exists() {
                return Ok((HubConfig::default(), PathBuf::from(".")));
            }
            default
        }
    };

    let config = HubConfig::from_file(&path)
        .map_err(|e| anyhow::anyhow!("failed to load {}: {e}", path.display()))?;
    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    Ok((config, base_dir))
}

async fn run_search(config: HubConfig, base_dir: &Path, args: SearchArgs) -> anyhow::Result<()> {
    let query = patent_hub::build_query(
        &config,
        SearchInput {
            databases: args.databases,
            keywords: args.keywords,
            patent_number: args.patent_number,
            sequential: args.sequential,
            max_results: args.max_results,
        },
    )?;
    let coordinator = patent_hub::build_coordinator(&config, base_dir)?;

    let cancel = match args.deadline {
        Some(seconds) => deadline_token(Duration::from_secs(seconds)),
        None => CancellationToken::new(),
    };

    // Handle Ctrl+C
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, cancelling search...");
            cancel_clone.cancel();
        }
    });

    let result = coordinator.coordinate_with_cancel(query, cancel).await;
    print!("{}", patent_hub::summarize(&result));

    let destination = patent_hub::export_destination(
        &config.export,
        &hub_dirs::exports_dir(),
        args.output.as_deref(),
        args.format.as_deref(),
        chrono::Local::now(),
    )?;
    if let Some((path, format)) = destination {
        let written = export(&result, &path, format)?;
        println!("Exported {} to {}", format, written.display());
    }

    patent_hub::search::ensure_completed(&result)?;
    Ok(())
}

fn list_databases(config: &HubConfig) -> anyhow::Result<()> {
    println!("Configured backends:");
    if config.backends.is_empty() {
        println!("  (none; add [[backends]] entries to the config file)");
    }
    for backend in &config.backends {
        println!(
            "  {:<8} {:<8} {}",
            backend.id,
            backend.kind.as_str(),
            backend.target()
        );
    }

    println!("\nKnown patent offices:");
    for office in PatentDatabase::all() {
        let marker = if config.backend(&DatabaseId::from(*office)).is_some() {
            "*"
        } else {
            " "
        };
        println!("  {marker} {:<8} {}", office.id(), office.name());
    }

    Ok(())
}

fn init_config(path: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(HubConfig::default_config_path);
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    HubConfig::default().save_to_file(&path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
