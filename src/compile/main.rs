//! Compile downloaded listings.
//!
//! Reads every raw CSV below the raw directory, then normalizes, aggregates
//! and summarizes the records into a clean CSV and a JSON summary.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gridscout::config::Config;
use gridscout::output::{read_raw_dir, run_dir, write_clean_csv, write_summary};
use gridscout::pipeline::compile;

#[derive(Parser, Debug)]
#[command(name = "compile")]
#[command(about = "Normalize and summarize downloaded listings")]
struct Args {
    /// TOML config file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of raw CSV files, overrides output.raw_dir
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output root, overrides output.clean_dir
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Keep every category instead of the configured allow-list
    #[arg(long)]
    all_categories: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => Config::default(),
    };
    if args.all_categories {
        config.transform.allowed_categories.clear();
    }

    let input = args.input.unwrap_or(config.output.raw_dir.clone());
    let output_root = args.output.unwrap_or(config.output.clean_dir.clone());

    info!("GridScout compile");
    let records = read_raw_dir(&input)
        .with_context(|| format!("Failed to read raw data under {}", input.display()))?;
    if records.is_empty() {
        anyhow::bail!("No raw records found under {}", input.display());
    }

    let (clean, stats) = compile(&records, &config.transform)?;
    info!("{} raw records compiled to {}", records.len(), clean.len());

    let out_dir = run_dir(&output_root, Local::now());
    write_clean_csv(&out_dir.join("restaurants.csv"), &clean)?;
    write_summary(&out_dir.join("summary.json"), &stats)?;

    if let Some(ratings) = &stats.ratings {
        info!(
            "{} well rated of {}: mean {:.2}, median {:.2}",
            stats.well_rated_observations, stats.observations, ratings.mean, ratings.median
        );
    }
    for place in &stats.top_rated {
        info!("Top: {} ({:.1}, {} ratings)", place.name, place.rating, place.rating_count);
    }
    for chain in &stats.top_chains {
        info!("Chain: {} ({} locations)", chain.name, chain.locations);
    }

    info!("Done: {}", out_dir.display());
    Ok(())
}
