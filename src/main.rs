use anyhow::{Context, Result};
use catchdm_crawler::app::ports::RecordStorePort;
use catchdm_crawler::app::{CrawlerDeps, Orchestrator};
use catchdm_crawler::clock::SystemClock;
use catchdm_crawler::config::{Config, DEFAULT_CONFIG_PATH};
use catchdm_crawler::infra::{BrowserlessFetcher, ClaudeExtractor, SupabaseRecordStore, TokioPacer};
use catchdm_crawler::storage::InMemoryRecordStore;
use catchdm_crawler::{logging, metrics, output};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "catchdm_crawler")]
#[command(about = "Crawls CatchDesMoines event listings into the events table")]
#[command(version)]
struct Cli {
    /// Extract and resolve events without writing to the store
    #[arg(long)]
    dry_run: bool,
    /// Maximum number of listing pages to crawl
    #[arg(long)]
    max_pages: Option<u32>,
    /// Optional TOML config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Directory for rolling JSON log files
    #[arg(long, default_value = "logs")]
    log_dir: String,
}

fn build_deps(config: &Config, dry_run: bool) -> Result<CrawlerDeps> {
    let fetcher = BrowserlessFetcher::new(config.fetcher_url()?, config.fetcher.token.as_deref())
        .context("building Browserless client")?;
    let extractor = ClaudeExtractor::new(config.extractor_api_key()?, &config.extractor);

    let store: Arc<dyn RecordStorePort> = match config.store_credentials() {
        Ok((url, key)) => Arc::new(SupabaseRecordStore::new(url, key, &config.store.table)),
        Err(e) if dry_run => {
            warn!("{}; dry run continues with an in-memory store", e);
            Arc::new(InMemoryRecordStore::new())
        }
        Err(e) => return Err(e.into()),
    };

    Ok(CrawlerDeps {
        fetcher: Arc::new(fetcher),
        extractor: Arc::new(extractor),
        store,
        pacer: Arc::new(TokioPacer),
        clock: Arc::new(SystemClock),
    })
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let _guard = logging::init_logging(&cli.log_dir);
    let metrics_handle = metrics::init_metrics();

    let mut config = Config::load(&cli.config).context("loading configuration")?;
    if let Some(max_pages) = cli.max_pages {
        config.crawl.max_pages = max_pages;
    }

    info!(
        dry_run = cli.dry_run,
        max_pages = config.crawl.max_pages,
        "Starting CatchDesMoines crawl"
    );

    let orchestrator = match build_deps(&config, cli.dry_run)
        .and_then(|deps| Orchestrator::new(deps, &config, cli.dry_run).map_err(Into::into))
    {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            error!("Failed to initialize crawler: {:#}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let outcome = orchestrator.run(config.crawl.max_pages).await;
    let summary = outcome.summary;

    match output::write_github_output(&summary) {
        Ok(true) => info!("Wrote run summary to GITHUB_OUTPUT"),
        Ok(false) => {}
        Err(e) => warn!("Failed to write GITHUB_OUTPUT: {}", e),
    }

    if let (Some(handle), Some(gateway)) = (&metrics_handle, config.metrics.pushgateway_url.as_deref()) {
        let instance = orchestrator.run_id().to_string();
        let client = reqwest::Client::new();
        if let Err(e) = metrics::push_metrics(&client, handle, gateway, &config.metrics.job, &instance).await {
            warn!("Failed to push metrics: {}", e);
        }
    }

    println!("\n📊 Crawl Results:");
    println!("   Events found: {}", summary.total_found);
    println!("   Inserted: {}", summary.inserted);
    println!("   Duplicates skipped: {}", summary.duplicates);
    if cli.dry_run {
        println!("   (dry run, nothing was written)");
    }

    if outcome.is_aborted() {
        error!("Crawl aborted");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
