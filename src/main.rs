//! Booru-Harvester main entry point
//!
//! This is the command-line interface for the Booru-Harvester downloader.

use anyhow::Context;
use booru_harvester::config::{
    finalize_config, limit_from_signed, load_config_with_hash, Config,
};
use booru_harvester::harvest::Harvester;
use booru_harvester::output::print_summary;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Booru-Harvester: downloads full-resolution images from an image board
///
/// Pages through the post listing for a search query, skips posts that are
/// already in the output directory, and downloads the rest with a bounded
/// pool of workers. Corrupt or interrupted downloads are retried.
#[derive(Parser, Debug)]
#[command(name = "booru-harvester")]
#[command(version)]
#[command(about = "Downloads full-resolution images from an image board", long_about = None)]
struct Cli {
    /// Optional TOML configuration file; flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output directory [default: outputs]
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    output: Option<String>,

    /// Site origin [default: https://gelbooru.com]
    #[arg(short = 's', long = "site", value_name = "URL")]
    site: Option<String>,

    /// Number of download workers, 1 to 256 [default: 16]
    #[arg(short = 't', long = "threads")]
    threads: Option<usize>,

    /// Maximum number of items to look at, -1 for no limit [default: -1]
    #[arg(short = 'c', long = "count", allow_negative_numbers = true)]
    count: Option<i64>,

    /// Maximum queued downloads before discovery pauses, at least 1, or -1 for no limit [default: 500]
    #[arg(long = "max-queue", allow_negative_numbers = true)]
    max_queue: Option<i64>,

    /// Search query [default: "sort:score:desc -video -real_life -animated -3d"]
    #[arg(short = 'q', long = "query")]
    query: Option<String>,

    /// Save one tag record per downloaded item
    #[arg(long = "enable-tags")]
    enable_tags: bool,

    /// Accept assets up to 1/5 shorter than their declared Content-Length
    #[arg(long = "soft-length-check")]
    soft_length_check: bool,

    /// Decode every image and probe it with a vertical flip before saving
    #[arg(long = "validate-images")]
    validate_images: bool,

    /// Tag ledger file name inside the output directory [default: tags.psv]
    #[arg(long = "tag-file")]
    tag_file: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Applies command-line overrides on top of a base configuration
    fn apply_overrides(&self, mut config: Config) -> Config {
        if let Some(output) = &self.output {
            config.output.directory = output.clone();
        }
        if let Some(site) = &self.site {
            config.site.base_url = site.clone();
        }
        if let Some(threads) = self.threads {
            config.crawler.workers = threads;
        }
        if let Some(count) = self.count {
            config.crawler.item_cap = limit_from_signed(count);
        }
        if let Some(max_queue) = self.max_queue {
            config.crawler.queue_ceiling = limit_from_signed(max_queue);
        }
        if let Some(query) = &self.query {
            config.site.query = query.clone();
        }
        if let Some(tag_file) = &self.tag_file {
            config.output.tag_file = tag_file.clone();
        }

        config.validation.save_tags |= self.enable_tags;
        config.validation.soft_length_check |= self.soft_length_check;
        config.validation.validate_images |= self.validate_images;

        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    install_interrupt_handler();

    let base = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };
    let config = finalize_config(cli.apply_overrides(base)).context("invalid configuration")?;

    tracing::info!(
        "Output: {}, workers: {}, queue ceiling: {}, item cap: {}",
        config.output.directory,
        config.crawler.workers,
        describe_limit(config.crawler.queue_ceiling),
        describe_limit(config.crawler.item_cap)
    );

    let mut harvester = Harvester::new(&config).context("failed to start harvester")?;
    let report = harvester.run().await;

    tracing::info!("Harvest finished: {:?}", report.exit);
    if !cli.quiet {
        print_summary(&report.stats, report.elapsed);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("booru_harvester=info,warn"),
            1 => EnvFilter::new("booru_harvester=debug,info"),
            2 => EnvFilter::new("booru_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Terminates the process on Ctrl-C without draining downloads
fn install_interrupt_handler() {
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, exiting immediately");
            std::process::exit(130);
        }
    });
}

fn describe_limit<T: std::fmt::Display>(limit: Option<T>) -> String {
    match limit {
        Some(value) => value.to_string(),
        None => "unlimited".to_string(),
    }
}
