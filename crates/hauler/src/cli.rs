use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, ensure};
use clap::{Args, Parser, Subcommand};
use console::style;
use tracing::warn;

use hauler_catalog::{HttpCatalogSource, HttpResolver, Item, Resolver, artifact_file_name};
use hauler_fetch::{Fetcher, ReqwestClient};
use hauler_remote::{Relocator, ToolStore};
use hauler_state::Ledger;

use crate::config::{
    self, CACHE_FILE, Config, ConfigOverrides, DEFAULT_DOWNLOAD_DIR, FileConfig, LEDGER_FILE,
};
use crate::pipeline::{Driver, DriverOptions};
use crate::progress::BarUi;

#[derive(Debug, Parser)]
#[command(
    name = "hauler",
    version,
    about = "Archive a paginated web catalog into remote storage",
    long_about = None,
    propagate_version = true
)]
pub struct App {
    /// TOML config file; flags override its values.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(alias = "r", about = "Scan the catalog and archive every pending item")]
    Run(RunArgs),
    #[command(alias = "o", about = "Archive a single item from its catalog page URL")]
    One(OneArgs),
    #[command(alias = "st", about = "Report cache, ledger, and pending counts")]
    Status(StatusArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// First catalog page to scan.
    #[arg(long)]
    pub start_page: Option<u32>,

    /// Last catalog page to scan.
    #[arg(long)]
    pub end_page: Option<u32>,

    /// Ignore the catalog cache and rescan the listing.
    #[arg(long)]
    pub rescan: bool,

    /// Resolve pending items and list them without transferring anything.
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Args)]
pub struct OneArgs {
    /// Catalog page URL of the item.
    pub url: String,

    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

pub async fn run(app: App) -> Result<()> {
    let file = config::load_file(app.config.as_deref())?;
    match app.cmd {
        Commands::Run(args) => run_catalog(file, args).await,
        Commands::One(args) => run_single(file, args).await,
        Commands::Status(args) => status(file, args),
    }
}

fn scrape_client(config: &Config) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .build()
        .context("failed to build HTTP client")
}

/// Flip a flag on Ctrl-C; the driver checks it between items so the
/// current transfer is left to finish or fail on its own.
fn interrupt_flag() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler = flag.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handler.store(true, Ordering::Relaxed);
            warn!("interrupt received, will stop after the current item");
        }
    });
    flag
}

async fn run_catalog(file: FileConfig, args: RunArgs) -> Result<()> {
    let config = Config::resolve(file, &args.overrides)?;
    std::fs::create_dir_all(&config.download_dir).with_context(|| {
        format!(
            "cannot create download directory {}",
            config.download_dir.display()
        )
    })?;

    let client = scrape_client(&config)?;
    let source = HttpCatalogSource::new(client.clone(), &config.base_url, &config.listing_path);
    let pages =
        args.start_page.unwrap_or(config.start_page)..=args.end_page.unwrap_or(config.end_page);
    let catalog =
        hauler_catalog::load_or_scan(&config.cache_path(), &source, pages, args.rescan).await?;

    let ledger = Ledger::load(config.ledger_path());
    let resolver = HttpResolver::new(client, &config.base_url);

    if args.dry_run {
        return dry_run(&catalog, &ledger, &resolver).await;
    }

    // Probe the tool before any item work: without it nothing can succeed.
    let store = ToolStore::probe(&config.tool, &config.remote_dir)?;
    let fetcher = Fetcher::new(
        ReqwestClient::new(&config.user_agent).context("failed to build transfer client")?,
    );
    let relocator = Relocator::new(store, config.verify_failure);

    let mut driver = Driver::new(
        resolver,
        fetcher,
        relocator,
        ledger,
        DriverOptions {
            download_dir: config.download_dir.clone(),
            item_delay: config.item_delay,
            shutdown: interrupt_flag(),
            ui: Arc::new(BarUi::new()),
        },
    );

    let summary = driver.run(&catalog).await;
    println!("{} {summary}", style("run complete:").green().bold());
    Ok(())
}

async fn dry_run<R: Resolver>(catalog: &[Item], ledger: &Ledger, resolver: &R) -> Result<()> {
    let pending: Vec<&Item> = catalog
        .iter()
        .filter(|item| !ledger.contains(&item.id))
        .collect();
    println!(
        "{} of {} item(s) pending",
        style(pending.len()).bold(),
        catalog.len()
    );

    for item in pending {
        match resolver.resolve(item).await {
            Ok(resolved) => {
                let name = artifact_file_name(item, resolved.suggested_name.as_deref());
                println!(
                    "  {}  {name} ({})",
                    style(&item.id).cyan(),
                    resolved.size_text
                );
            }
            Err(err) => {
                println!(
                    "  {}  {} {err}",
                    style(&item.id).cyan(),
                    style("unresolvable:").yellow()
                );
            }
        }
    }
    Ok(())
}

async fn run_single(file: FileConfig, args: OneArgs) -> Result<()> {
    let config = Config::resolve(file, &args.overrides)?;
    std::fs::create_dir_all(&config.download_dir).with_context(|| {
        format!(
            "cannot create download directory {}",
            config.download_dir.display()
        )
    })?;

    let client = scrape_client(&config)?;
    let source = HttpCatalogSource::new(client.clone(), &config.base_url, &config.listing_path);
    let item = source.single_item(&args.url).await?;

    let ledger = Ledger::load(config.ledger_path());
    if ledger.contains(&item.id) {
        println!(
            "{} item {} is already archived",
            style("skip:").yellow(),
            item.id
        );
        return Ok(());
    }

    let store = ToolStore::probe(&config.tool, &config.remote_dir)?;
    let fetcher = Fetcher::new(
        ReqwestClient::new(&config.user_agent).context("failed to build transfer client")?,
    );
    let relocator = Relocator::new(store, config.verify_failure);
    let resolver = HttpResolver::new(client, &config.base_url);

    let mut driver = Driver::new(
        resolver,
        fetcher,
        relocator,
        ledger,
        DriverOptions {
            download_dir: config.download_dir.clone(),
            item_delay: config.item_delay,
            shutdown: interrupt_flag(),
            ui: Arc::new(BarUi::new()),
        },
    );

    let summary = driver.run(std::slice::from_ref(&item)).await;
    ensure!(summary.succeeded == 1, "item {} was not archived", item.id);
    println!("{} item {} archived", style("done:").green().bold(), item.id);
    Ok(())
}

fn status(file: FileConfig, args: StatusArgs) -> Result<()> {
    // Status needs no catalog or remote settings, only where state lives.
    let download_dir = args
        .overrides
        .download_dir
        .clone()
        .or(file.download_dir)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_DIR));

    let ledger = Ledger::load(download_dir.join(LEDGER_FILE));
    match hauler_catalog::read_cache(&download_dir.join(CACHE_FILE)) {
        Some(items) => {
            let pending = items.iter().filter(|item| !ledger.contains(&item.id)).count();
            println!("catalog:   {} item(s) cached", items.len());
            println!("completed: {}", ledger.len());
            println!("pending:   {pending}");
        }
        None => {
            println!("catalog:   no cache yet (run `hauler run` to scan)");
            println!("completed: {}", ledger.len());
        }
    }
    Ok(())
}
