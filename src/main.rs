use anyhow::Context;
use clap::Parser;
use listing_crawler::config::{self, Config, CustomTarget};
use listing_crawler::pipeline::{Pipeline, RunMode, RunOutput};
use listing_crawler::scrapers::{ChromeLauncher, PaginationPolicy, SortStrategy};
use listing_crawler::sync::{run_prefix, sync_directory, GcsSink};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Real-estate listing crawler
///
/// Collects listing links from search result pages, then visits each
/// listing and appends its details to a CSV table.
#[derive(Parser, Debug)]
#[command(name = "listing-crawler", version)]
struct Cli {
    /// TOML configuration file; flags below override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Result pages to harvest per target
    #[arg(long = "paginas", alias = "pages")]
    pages: Option<u32>,

    /// Maximum number of links sent to detail extraction
    #[arg(long = "limite-links", alias = "links-limit")]
    links_limit: Option<usize>,

    /// Show the browser window
    #[arg(long)]
    no_headless: bool,

    /// Base output directory
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Named search target (repeatable)
    #[arg(long = "target", value_name = "NAME")]
    targets: Vec<String>,

    /// Custom search URL, harvested as target "custom"
    #[arg(long)]
    url_base: Option<String>,

    /// Sort strategy (repeatable)
    #[arg(long = "ordem", value_enum)]
    sort: Vec<SortStrategy>,

    /// Pagination policy for result pages
    #[arg(long, value_enum)]
    pagination: Option<PaginationPolicy>,

    /// Only harvest links
    #[arg(long, conflicts_with_all = ["link", "links_csv"])]
    only_links: bool,

    /// Extract a single listing
    #[arg(long, conflicts_with = "links_csv")]
    link: Option<String>,

    /// Extract listings from existing link tables (repeatable)
    #[arg(long, value_name = "CSV")]
    links_csv: Vec<PathBuf>,

    /// Bucket that receives a copy of the output directory
    #[arg(long)]
    bucket: Option<String>,

    /// Bearer token for bucket uploads
    #[arg(long, env = "GCS_ACCESS_TOKEN", hide_env_values = true)]
    gcs_token: Option<String>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn mode(&self) -> RunMode {
        if let Some(link) = &self.link {
            RunMode::Single(link.clone())
        } else if !self.links_csv.is_empty() {
            RunMode::FromTables(self.links_csv.clone())
        } else if self.only_links {
            RunMode::LinksOnly
        } else {
            RunMode::Full
        }
    }

    /// Applies command-line overrides on top of `config`
    fn apply(&self, mut config: Config) -> Config {
        if let Some(pages) = self.pages {
            config.pages = pages;
        }
        if self.links_limit.is_some() {
            config.links_limit = self.links_limit;
        }
        if self.no_headless {
            config.headless = false;
        }
        if let Some(out_dir) = &self.out_dir {
            config.output_dir = out_dir.clone();
        }
        if !self.targets.is_empty() {
            config.targets = self.targets.clone();
        }
        if let Some(url) = &self.url_base {
            if self.targets.is_empty() {
                config.targets.clear();
            }
            config.custom_targets.push(CustomTarget {
                id: "custom".to_string(),
                url: url.clone(),
            });
        }
        if !self.sort.is_empty() {
            config.sort = self.sort.clone();
        }
        if let Some(pagination) = self.pagination {
            config.harvest.pagination = pagination;
        }
        if self.bucket.is_some() {
            config.sync.bucket = self.bucket.clone();
        }
        if self.gcs_token.is_some() {
            config.sync.token = self.gcs_token.clone();
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    let base = match &cli.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            config::load_config(path).context("Failed to load configuration")?
        }
        None => Config::default(),
    };
    let config = cli.apply(base);
    config::validate(&config).context("Invalid configuration")?;

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create {}", config.output_dir.display()))?;

    let output_dir = config.output_dir.clone();
    let sync = config.sync.clone();
    let mode = cli.mode();

    info!("🏠 Listing crawler: {:?}", mode);
    let pipeline = Pipeline::new(config.clone(), ChromeLauncher::new(config.headless));
    match pipeline.run(mode).await {
        Ok(Some(output)) => report(&output),
        Ok(None) => error!("Pipeline finished without results"),
        Err(e) => error!("FATAL: {}", e),
    }

    if let Some(bucket) = &sync.bucket {
        match GcsSink::new(bucket.clone(), sync.endpoint.clone(), sync.token.clone()) {
            Ok(sink) => {
                sync_directory(&sink, &output_dir, &run_prefix()).await;
            }
            Err(e) => error!("Upload skipped: {:#}", e),
        }
    }

    Ok(())
}

fn report(output: &RunOutput) {
    for table in &output.link_tables {
        info!("Links saved to: {}", table.display());
    }
    if let Some(data) = &output.data_table {
        info!("Data saved to: {}", data.display());
    }
    if let Some(summary) = output.summary {
        info!(
            "Processed: {}, skipped: {}, total: {}",
            summary.processed, summary.skipped, summary.total
        );
    }
}

/// Sets up the tracing subscriber; `RUST_LOG` wins over the flags
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            EnvFilter::new("error")
        } else {
            match verbose {
                0 => EnvFilter::new("listing_crawler=info,warn"),
                1 => EnvFilter::new("listing_crawler=debug,info"),
                _ => EnvFilter::new("trace"),
            }
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
