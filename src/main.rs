use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{fmt::Debug, path::PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use catalog_mirror::catalog::{CatalogItem, CatalogSource, NullCatalogSource, SnapshotSource};
use catalog_mirror::config::{self, ChecksumPolicy, PathMode};
use catalog_mirror::sync::{BatchReport, SyncEngine, UpsertContext};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

fn parse_dir(s: &str) -> Result<PathBuf, String> {
    let path = parse_path(s)?;
    if !path.exists() {
        return Err(format!("Directory does not exist: {}", s));
    }
    if !path.is_dir() {
        return Err(format!("Path is not a directory: {}", s));
    }
    Ok(path)
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory containing the database files (library.db, mirror_identity.db).
    /// Can also be specified in config file.
    #[clap(long, value_parser = parse_dir)]
    pub db_dir: Option<PathBuf>,

    /// When an already mirrored item counts as unchanged.
    #[clap(long, value_enum)]
    pub checksum_policy: Option<ChecksumPolicy>,

    /// How playable locations are written to the library.
    #[clap(long, value_enum)]
    pub path_mode: Option<PathMode>,

    /// Items per transaction during a batch, 0 to commit once at the end.
    #[clap(long)]
    pub commit_every: Option<usize>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upsert the items of a JSON file.
    Sync {
        #[clap(value_parser = parse_path)]
        items: PathBuf,

        /// Library section the items belong to.
        #[clap(long)]
        view_id: Option<String>,

        /// Section name, recorded as a tag on films and series.
        #[clap(long)]
        view_tag: Option<String>,

        /// JSON snapshot used to resolve parents that are not mirrored yet.
        #[clap(long, value_parser = parse_path)]
        parents: Option<PathBuf>,
    },
    /// Remove mirrored items.
    Remove {
        #[clap(required = true)]
        remote_ids: Vec<String>,
    },
    /// Remove the descendants of a mirrored item, keeping the item.
    RemoveChildren { remote_id: String },
    /// Print the local record of a remote id.
    Lookup { remote_id: String },
    /// Print row counts of the library.
    Stats,
}

impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            db_dir: args.db_dir.clone(),
            checksum_policy: args.checksum_policy,
            path_mode: args.path_mode,
            commit_every: args.commit_every,
        }
    }
}

fn cancellation_on_ctrl_c() -> Result<CancellationToken> {
    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        warn!("Interrupted, stopping after the current item");
        handler_token.cancel();
    })
    .context("Failed to install Ctrl-C handler")?;
    Ok(token)
}

fn print_report(report: &BatchReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    if report.needs_attention() {
        warn!("Some items were not synced, see the log above");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  db_dir: {:?}", app_config.db_dir);
    info!("  checksum_policy: {:?}", app_config.sync.checksum_policy);
    info!("  path_mode: {:?}", app_config.sync.path_mode);

    let source: Box<dyn CatalogSource> = match &cli_args.command {
        Command::Sync {
            parents: Some(path),
            ..
        } => {
            let snapshot = SnapshotSource::load(path)?;
            info!("Loaded {} parent items from {:?}", snapshot.len(), path);
            Box::new(snapshot)
        }
        _ => Box::new(NullCatalogSource),
    };

    let engine = SyncEngine::open(
        &app_config.library_db_path(),
        &app_config.identity_db_path(),
        app_config.sync.clone(),
        source,
    )?;

    match cli_args.command {
        Command::Sync {
            items,
            view_id,
            view_tag,
            ..
        } => {
            let json = std::fs::read_to_string(&items)
                .with_context(|| format!("Failed to read items file {:?}", items))?;
            let items = CatalogItem::list_from_json(&json)
                .with_context(|| format!("Failed to parse items file {:?}", items))?;
            let mut ctx = UpsertContext::default();
            ctx.view_id = view_id;
            ctx.view_tag = view_tag;
            let cancel = cancellation_on_ctrl_c()?;
            let report = engine.sync_batch(&items, &ctx, &cancel)?;
            print_report(&report)?;
        }
        Command::Remove { remote_ids } => {
            let cancel = cancellation_on_ctrl_c()?;
            let report = engine.remove_batch(&remote_ids, &cancel)?;
            print_report(&report)?;
        }
        Command::RemoveChildren { remote_id } => {
            let removed = engine.remove_children(&remote_id)?;
            println!("Removed {} records below {}", removed, remote_id);
        }
        Command::Lookup { remote_id } => match engine.lookup_local(&remote_id)? {
            Some((local_id, kind)) => println!("{} {}", kind, local_id),
            None => println!("{} is not mirrored", remote_id),
        },
        Command::Stats => {
            let stats = engine.stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}
