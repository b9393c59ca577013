//! Grid search download.
//!
//! Builds the search grid, keeps the points inside the region, queries the
//! places API around each one and writes the raw listings to CSV.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use gridscout::config::Config;
use gridscout::output::{run_dir, write_failures_csv, write_grid_csv, write_raw_csv};
use gridscout::pipeline::{load_region, plan_search, run_collection};
use gridscout::places::{PlacesApi, PlacesClient};
use gridscout::Coordinate;

#[derive(Parser, Debug)]
#[command(name = "download")]
#[command(about = "Collect restaurant listings over a search grid")]
struct Args {
    /// TOML config file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Places API key
    #[arg(long, env = "GMAPS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Grid start as "lat, lon"
    #[arg(long)]
    start: Option<String>,

    /// Grid spacing in meters
    #[arg(long)]
    spacing: Option<f64>,

    /// Grid iterations in each direction
    #[arg(long)]
    iterations: Option<i32>,

    /// Places API flavour
    #[arg(long, value_parser = parse_api)]
    api: Option<PlacesApi>,

    /// Region source, URL or GeoJSON path
    #[arg(long)]
    region: Option<String>,

    /// Keep only these polygons of the region (repeatable)
    #[arg(long = "select")]
    select: Vec<String>,

    /// Concurrent point searches
    #[arg(long)]
    concurrency: Option<usize>,

    /// Write the filtered grid and stop before any API call
    #[arg(long)]
    plan_only: bool,
}

fn parse_api(value: &str) -> Result<PlacesApi, String> {
    match value {
        "nearby" => Ok(PlacesApi::Nearby),
        "legacy" => Ok(PlacesApi::Legacy),
        other => Err(format!("unknown api '{}', expected nearby or legacy", other)),
    }
}

impl Args {
    fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(start) = &self.start {
            config.search.start = Coordinate::parse(start).context("Invalid --start")?;
        }
        if let Some(spacing) = self.spacing {
            config.search.spacing_m = spacing;
        }
        if let Some(iterations) = self.iterations {
            config.search.iterations = iterations;
        }
        if let Some(api) = self.api {
            config.search.api = api;
        }
        if let Some(region) = &self.region {
            config.region.source = region.clone();
        }
        if !self.select.is_empty() {
            config.region.select = self.select.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.search.concurrency = concurrency;
        }
        Ok(())
    }
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
    args.apply(&mut config)?;

    info!("GridScout download");
    info!(
        "Start {}, spacing {} m, {} iterations",
        config.search.start, config.search.spacing_m, config.search.iterations
    );

    let region = load_region(&config.region).await?;
    info!("Region has {} polygons", region.len());

    let plan = plan_search(&config.search, &region)?;
    let out_dir = run_dir(&config.output.raw_dir, Local::now());

    if args.plan_only {
        write_grid_csv(&out_dir.join("grid.csv"), &plan.matches)?;
        info!("Plan written, skipping search");
        return Ok(());
    }

    let api_key = args
        .api_key
        .clone()
        .context("No API key, pass --api-key or set GMAPS_API_KEY")?;
    let client = PlacesClient::new(api_key, config.search.client_options())
        .context("Failed to create places client")?;

    let report = tokio::select! {
        report = run_collection(&plan, &client, config.search.concurrency) => report?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, nothing written");
            anyhow::bail!("Interrupted");
        }
    };

    info!(
        "{} of {} points searched, {} records",
        report.points_succeeded(),
        report.points_attempted,
        report.records.len()
    );

    write_raw_csv(&out_dir.join("locs.csv"), &report.records)?;
    if !report.is_complete() {
        for failure in report.failures.iter().take(10) {
            error!("Point {} ({}) failed: {}", failure.index, failure.point, failure.error);
        }
        write_failures_csv(&out_dir.join("failed_points.csv"), &report.failures)?;
    }

    info!("Done: {}", out_dir.display());
    Ok(())
}
