use std::path::PathBuf;

use clap::Parser;
use imsort::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Sort geotagged photos into one folder per place
#[derive(Parser)]
struct Cli {
    /// Settings file
    #[arg(short, long, default_value_os_t = Config::default_path())]
    config: PathBuf,
    /// Directory/folder holding the photos
    #[arg(short, long)]
    dir: Option<PathBuf>,
    /// Minutes after the first photo before a new place is looked up
    #[arg(short, long)]
    threshold: Option<u32>,
    /// Google Maps API key, overrides GOOGLE_MAPS_API_KEY
    #[arg(long)]
    api_key: Option<String>,
    /// Directory for cached geocode responses
    #[arg(long)]
    cache_dir: Option<PathBuf>,
    /// Print the grouping as JSON and leave the photos alone
    #[arg(long, action)]
    dry_run: bool,
    #[arg(short, long, action)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_filter = if args.verbose {
        "imsort=debug,info"
    } else {
        "imsort=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = Config::load(&args.config)?.with_env();
    if let Some(dir) = args.dir {
        config.image_folder = dir;
    }
    if let Some(threshold) = args.threshold {
        config.time_threshold_minutes = threshold;
    }
    if args.api_key.is_some() {
        config.google_maps_api_key = args.api_key;
    }
    if args.cache_dir.is_some() {
        config.cache_dir = args.cache_dir;
    }

    if args.dry_run {
        let plan = imsort::plan(&config)?;
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    let report = imsort::run(&config)?;
    tracing::info!(
        "Created {} folders ({} already there), moved {} photos",
        report.folders_created,
        report.folders_existing,
        report.files_moved
    );
    if !report.failures.is_empty() {
        anyhow::bail!("{} file operations failed", report.failures.len());
    }
    Ok(())
}
